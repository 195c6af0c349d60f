//! Error types for arbor.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Library-level operations return these; only `main` turns them into text and
//! exit codes.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for arbor operations.
#[derive(Error, Debug)]
pub enum ArborError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Git operation failed.
    #[error("Git operation failed: {0}")]
    GitError(String),

    /// An external command exceeded its deadline and was killed.
    #[error("Command timed out: {0}")]
    CommandTimeout(String),

    /// An external command was canceled by the caller.
    #[error("Command canceled: {0}")]
    Canceled(String),

    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored record exists but could not be decoded or failed validation.
    #[error("Corrupt record: {0}")]
    DecodeError(String),

    /// The session metadata store could not be read or written.
    #[error("Metadata store error: {0}")]
    StoreError(String),

    /// The terminal multiplexer failed.
    #[error("Session backend error: {0}")]
    SessionError(String),

    /// A lock file could not be handled.
    #[error("Lock error: {0}")]
    LockError(String),
}

impl ArborError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArborError::UserError(_) | ArborError::NotFound(_) | ArborError::Canceled(_) => {
                exit_codes::USER_ERROR
            }
            ArborError::GitError(_) | ArborError::CommandTimeout(_) => exit_codes::GIT_FAILURE,
            ArborError::DecodeError(_) | ArborError::StoreError(_) => exit_codes::STORE_FAILURE,
            ArborError::SessionError(_) => exit_codes::SESSION_FAILURE,
            ArborError::LockError(_) => exit_codes::LOCK_FAILURE,
        }
    }

    /// True when the error is a missing record rather than a broken one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArborError::NotFound(_))
    }
}

/// Result type alias for arbor operations.
pub type Result<T> = std::result::Result<T, ArborError>;
