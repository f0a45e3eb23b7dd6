//! Utility functions and helpers.
//!
//! Environment variable lookup and `${VAR}` interpolation for config values.

pub mod env;

pub use env::{get_env_with_prefix, interpolate_env};
