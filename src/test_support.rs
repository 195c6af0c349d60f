use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::locks::ProcessProbe;
use crate::session::{BackendKind, SessionBackend, SessionProbe};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Ensure the repo uses a deterministic default branch name across environments.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    // Initial commit (required for worktree creation)
    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

/// Resolve a context for a scratch repo, with the state dir created.
pub(crate) fn test_context(repo: &Path) -> RepoContext {
    RepoContext::resolve_from(repo, &Config::default()).unwrap()
}

/// Add a linked worktree under `.worktrees/<branch>` on a new branch.
pub(crate) fn add_worktree(repo: &Path, branch: &str) -> PathBuf {
    let wt = repo.join(".worktrees").join(branch);
    git(
        repo,
        &["worktree", "add", "-b", branch, wt.to_str().unwrap()],
    );
    wt
}

/// Commit a new file inside `dir`.
pub(crate) fn commit_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", &format!("Add {}", name)]);
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// In-memory session backend.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub unavailable: bool,
    pub sessions: Mutex<BTreeMap<String, SessionProbe>>,
    pub created: Mutex<Vec<(String, PathBuf, Option<String>)>>,
    pub attached: Mutex<Vec<String>>,
    pub killed: Mutex<Vec<String>>,
    /// Sessions whose probe fails.
    pub broken: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_sessions(names: &[&str]) -> Self {
        let backend = Self::default();
        for name in names {
            backend.add_live(name, SessionProbe::default());
        }
        backend
    }

    pub fn add_live(&self, name: &str, probe: SessionProbe) {
        self.sessions
            .lock()
            .unwrap()
            .insert(name.to_string(), probe);
    }

    pub fn end(&self, name: &str) {
        self.sessions.lock().unwrap().remove(name);
    }
}

impl SessionBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tmux
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn has_session(&self, name: &str) -> Result<bool> {
        Ok(self.sessions.lock().unwrap().contains_key(name))
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.sessions.lock().unwrap().keys().cloned().collect())
    }

    fn create_session(&self, name: &str, working_dir: &Path, command: Option<&str>) -> Result<()> {
        self.created.lock().unwrap().push((
            name.to_string(),
            working_dir.to_path_buf(),
            command.map(str::to_string),
        ));
        self.add_live(
            name,
            SessionProbe {
                windows: 1,
                panes: 1,
                ..SessionProbe::default()
            },
        );
        Ok(())
    }

    fn attach_to_session(&self, name: &str) -> Result<()> {
        self.attached.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.killed.lock().unwrap().push(name.to_string());
        self.end(name);
        Ok(())
    }

    fn probe(&self, name: &str) -> Result<Option<SessionProbe>> {
        if self.broken.lock().unwrap().iter().any(|b| b == name) {
            return Err(ArborError::SessionError(format!("probe failed for {}", name)));
        }
        Ok(self.sessions.lock().unwrap().get(name).cloned())
    }
}

/// Liveness answers keyed by pid; pids it was not told about are dead.
#[derive(Default)]
pub(crate) struct FakeProbe {
    answers: HashMap<u32, Option<bool>>,
}

impl FakeProbe {
    pub fn with(answers: &[(u32, Option<bool>)]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
        }
    }
}

impl ProcessProbe for FakeProbe {
    fn is_alive(&self, pid: u32) -> Option<bool> {
        self.answers.get(&pid).copied().unwrap_or(Some(false))
    }
}
