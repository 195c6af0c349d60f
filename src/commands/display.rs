//! Shared output formatting.

use crate::health::{HealthCheckResult, IssueSeverity};
use chrono::Duration;

/// Compact age: `3d`, `5h`, `12m`, `now`.
pub fn format_age(age: Duration) -> String {
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m", age.num_minutes())
    } else {
        "now".to_string()
    }
}

/// `↑2 ↓1`, or empty when even.
pub fn format_ahead_behind(ahead: u32, behind: u32) -> String {
    let mut parts = Vec::new();
    if ahead > 0 {
        parts.push(format!("↑{}", ahead));
    }
    if behind > 0 {
        parts.push(format!("↓{}", behind));
    }
    parts.join(" ")
}

/// Print one health result with its issues.
pub fn print_health_result(result: &HealthCheckResult) {
    if result.healthy() {
        println!("{} {}", IssueSeverity::Ok.icon(), result.label());
        return;
    }

    let max = result.max_severity();
    println!("{} {} [{}]", max.icon(), result.label(), max);
    for issue in &result.issues {
        println!("    [{}] {}: {}", issue.severity, issue.category, issue.description);
        if let Some(hint) = &issue.hint {
            let mut lines = hint.lines();
            if let Some(first) = lines.next() {
                println!("      Fix: {}", first);
            }
            for line in lines {
                println!("           {}", line);
            }
        }
        if issue.repairable() {
            println!("      (repairable with `arbor repair`)");
        }
    }
}

/// End-of-run summary line for a set of results.
pub fn health_summary(results: &[HealthCheckResult]) -> String {
    let healthy = results.iter().filter(|r| r.healthy()).count();
    let repairable: usize = results.iter().map(|r| r.repairable_count()).sum();
    format!(
        "{} checked: {} healthy, {} with issues, {} repairable issue(s)",
        results.len(),
        healthy,
        results.len() - healthy,
        repairable
    )
}
