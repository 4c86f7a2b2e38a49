//! Configuration management for d2b-asl
//!
//! The configuration is a small TOML file holding defaults for the `asl`
//! plugin. Its location can be overridden with the `D2B_ASL_CONFIG`
//! environment variable or with a pointer file next to the default location.

pub mod config;
pub mod errors;

pub use config::{Config, CONFIG_ENV_VAR, CONFIG_KEYS};
pub use errors::ConfigError;
