//! Configuration models and loading for Mnemos.
//!
//! This crate owns the config schema for the hosted backends, the JSON5 file
//! loader, the environment overlay and validation used by the server binary.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Environment variable names understood by the loader.
pub use loader::ENV_KEYS;
/// Configuration schema models.
pub use model::*;
