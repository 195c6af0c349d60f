//! Exit code constants for the arbor CLI.
//!
//! - 0: Success (including "nothing to do")
//! - 1: User error (bad args, repository not resolvable, invalid config)
//! - 2: Session metadata store failure
//! - 3: Git operation failure
//! - 4: Session backend failure
//! - 5: Lock failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or repository not resolvable.
pub const USER_ERROR: i32 = 1;

/// The session metadata store could not be read or written.
pub const STORE_FAILURE: i32 = 2;

/// Git operation failure, including timeouts of the git process.
pub const GIT_FAILURE: i32 = 3;

/// The terminal multiplexer backend failed or is unavailable.
pub const SESSION_FAILURE: i32 = 4;

/// A lock could not be removed or is held by a live process.
pub const LOCK_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            STORE_FAILURE,
            GIT_FAILURE,
            SESSION_FAILURE,
            LOCK_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
