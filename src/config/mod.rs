//! Configuration model for arbor.
//!
//! This module defines the Config struct that represents `.arbor/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.
//!
//! The config is an explicit value passed to each component at construction,
//! never read from ambient global state.

mod model;
mod operations;
pub mod types;


pub use model::Config;
pub use types::IssueProviderKind;
