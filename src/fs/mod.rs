//! Filesystem utilities for arbor.
//!
//! Atomic writes keep session metadata readable at every instant, even when a
//! process crashes mid-write or two processes write the same record.

pub mod atomic;

pub use atomic::atomic_write;
