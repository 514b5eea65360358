use crate::loader::LoaderError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type for mimic operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid rule pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("Invalid loader pipeline `{pipeline}`: {reason}")]
    InvalidPipeline { pipeline: String, reason: String },

    #[error("Cannot resolve loader `{name}` (also tried `{name}-loader`)")]
    LoaderNotFound { name: String },

    #[error("Loader `{loader}` (index {index}) failed: {source}")]
    Transform {
        loader: String,
        index: usize,
        #[source]
        source: LoaderError,
    },

    #[error("Cannot find module '{specifier}' from {parent}")]
    ModuleNotFound { specifier: String, parent: PathBuf },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },

    #[error("mimic must be installed before invoking require_with_context")]
    NotInstalled,

    #[error("domSupport is enabled but no global environment was provided")]
    MissingEnvironment,

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
