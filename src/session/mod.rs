//! Background sessions bound to worktrees.
//!
//! - [`SessionStore`]: durable, atomic metadata records, one per session name
//! - [`SessionBackend`]: the multiplexer capability, implemented by [`TmuxBackend`]
//! - Reconciliation of records against live sessions (orphans are flagged, not deleted)
//! - Status inference from backend probes
//! - Project detection and dependency installation for new sessions

mod backend;
mod deps;
mod manager;
mod metadata;
mod naming;
mod reconcile;
mod status;
mod store;
mod tmux;


pub use backend::{SessionBackend, SessionProbe};
pub use deps::{ProjectKind, detect_project, install_dependencies};
pub use manager::{
    CreatedSession, SessionOutcome, attach_session, create_session, prune_orphans,
    reconcile_sessions, refresh_statuses,
};
pub use metadata::{BackendKind, DependencyInfo, SessionMetadata, SessionStatus};
pub use naming::session_name;
pub use reconcile::{Reconciliation, reconcile};
pub use status::{IDLE_AFTER_MINUTES, StatusInference};
pub use store::{SessionStore, StoreScan};
pub use tmux::TmuxBackend;
