use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or updating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Currently supported keys: include-aslcontext-json, log-dir")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for config key '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
