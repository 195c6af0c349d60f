//! Cross-checking stored session metadata against live sessions.

use super::metadata::SessionMetadata;
use std::collections::HashSet;

/// Result of comparing the metadata store with the backend's live list.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Records whose session is live.
    pub live: Vec<SessionMetadata>,
    /// Records with no live session. Flagged, never deleted here.
    pub orphaned: Vec<SessionMetadata>,
    /// Live sessions with our prefix but no record.
    pub untracked: Vec<String>,
}

/// Partition `records` by whether `live_sessions` contains their name.
///
/// `prefix` limits which unrecorded live sessions are reported as untracked, so
/// sessions arbor did not create are left out.
pub fn reconcile(records: Vec<SessionMetadata>, live_sessions: &[String], prefix: &str) -> Reconciliation {
    let live_names: HashSet<&str> = live_sessions.iter().map(String::as_str).collect();
    let recorded: HashSet<String> = records.iter().map(|m| m.session_name.clone()).collect();

    let (live, orphaned): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|m| live_names.contains(m.session_name.as_str()));

    let marker = format!("{}-", prefix);
    let mut untracked: Vec<String> = live_sessions
        .iter()
        .filter(|name| name.starts_with(&marker) && !recorded.contains(*name))
        .cloned()
        .collect();
    untracked.sort();

    Reconciliation {
        live,
        orphaned,
        untracked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::metadata::BackendKind;

    fn record(name: &str) -> SessionMetadata {
        SessionMetadata::new(name, BackendKind::Tmux, "/wt", "b")
    }

    #[test]
    fn test_missing_live_session_is_orphaned() {
        let result = reconcile(
            vec![record("arbor-r-x"), record("arbor-r-y")],
            &["arbor-r-y".to_string()],
            "arbor",
        );
        assert_eq!(result.orphaned.len(), 1);
        assert_eq!(result.orphaned[0].session_name, "arbor-r-x");
        assert_eq!(result.live.len(), 1);
        assert_eq!(result.live[0].session_name, "arbor-r-y");
    }

    #[test]
    fn test_untracked_only_counts_prefixed_sessions() {
        let result = reconcile(
            vec![],
            &["arbor-r-z".to_string(), "work".to_string()],
            "arbor",
        );
        assert_eq!(result.untracked, vec!["arbor-r-z".to_string()]);
    }

    #[test]
    fn test_no_backend_sessions_orphans_everything() {
        let result = reconcile(vec![record("a"), record("b")], &[], "arbor");
        assert!(result.live.is_empty());
        assert_eq!(result.orphaned.len(), 2);
    }
}
