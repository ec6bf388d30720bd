//! Error types for configuration, chain and store operations.

use hiss_core::ValidationError;
use hiss_registry::RegistryError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration or building chains.
///
/// Chain errors are raised when the chain is constructed, never while it
/// renders.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write a file
    #[error("failed to access file '{path}': {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Render setting outside its usable range
    #[error("invalid render setting '{key}': {reason}")]
    InvalidSetting {
        /// Setting name.
        key: &'static str,
        /// Why the value is unusable.
        reason: String,
    },

    /// Processor id not present in the registry
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),

    /// Chain configuration has no stages
    #[error("processing chain is empty")]
    EmptyChain,

    /// First stage is not a noise source
    #[error("first chain stage '{0}' is not a noise source")]
    FirstStageNotGenerator(String),

    /// A noise source appears after the first stage
    #[error("chain stage {index} ('{id}') is a noise source; only the first stage may generate")]
    GeneratorAfterFirst {
        /// Position in the chain.
        index: usize,
        /// Processor id.
        id: String,
    },

    /// Two processors declare the same parameter name differently
    #[error("parameter '{0}' is declared with conflicting definitions")]
    ConflictingParameter(String),

    /// Registry rejected a processor or its parameters
    #[error(transparent)]
    Registry(RegistryError),

    /// Parameter value or definition rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<RegistryError> for ConfigError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownProcessor(id) => ConfigError::UnknownProcessor(id),
            other => ConfigError::Registry(other),
        }
    }
}
