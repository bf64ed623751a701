// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Message encoding error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("failed to launch sandbox for image '{image}': {source}")]
    Launch {
        image: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScriptError>;
