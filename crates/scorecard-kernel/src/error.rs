//! Error types for kernel operations.
//!
//! Only [`ConfigError`] is ever fatal. [`ReadError`] describes a single
//! unreadable input; loaders downgrade it into a [`LoadWarning`] and move on.

use serde::{Deserialize, Serialize};

/// Threshold/penalty configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config at {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// A single input file could not be read or decoded.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read file: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json at {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected shape at {path}: {reason}")]
    Shape { path: String, reason: String },
}

impl ReadError {
    /// True when the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A non-fatal problem encountered while loading scenario inputs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadWarning {
    pub source: String,
    pub message: String,
}

impl LoadWarning {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Build a warning from a read failure and emit it as a tracing event.
    pub fn from_read_error(source: impl Into<String>, error: &ReadError) -> Self {
        let warning = Self::new(source, error.to_string());
        tracing::warn!(source = %warning.source, "{}", warning.message);
        warning
    }

    /// Build a warning and emit it as a tracing event.
    pub fn emit(source: impl Into<String>, message: impl Into<String>) -> Self {
        let warning = Self::new(source, message);
        tracing::warn!(source = %warning.source, "{}", warning.message);
        warning
    }
}
