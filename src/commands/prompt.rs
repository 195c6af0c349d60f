//! Interactive confirmation.

use crate::error::{ArborError, Result};
use std::io::{self, BufRead, IsTerminal, Write};

/// Asks the user yes/no questions.
pub trait Prompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Prompts on stderr and reads the answer from stdin.
///
/// Without a terminal on stdin every question takes its default.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        if !io::stdin().is_terminal() {
            return Ok(default);
        }

        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} {} ", question, suffix);
        io::stderr()
            .flush()
            .map_err(|e| ArborError::UserError(format!("failed to write prompt: {}", e)))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| ArborError::UserError(format!("failed to read answer: {}", e)))?;

        Ok(parse_answer(&line).unwrap_or(default))
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Answers from a fixed script, recording the questions asked.
#[cfg(test)]
pub(crate) struct ScriptedPrompter {
    answers: std::collections::VecDeque<bool>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or(default))
    }
}
