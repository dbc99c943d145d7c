//! Error types for aiscout.
//!
//! Library crates use [`AiScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for all aiscout operations.
#[derive(Debug, thiserror::Error)]
pub enum AiScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error (connect failure, timeout, non-2xx status).
    #[error("network error: {0}")]
    Network(String),

    /// Selector or structure mismatch yielding no usable listings.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// JSON-RPC error reply or a malformed tool-call payload.
    #[error("protocol error{}: {message}", fmt_code(.code))]
    Protocol { code: Option<i64>, message: String },

    /// A normalized record lacks a required field.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn fmt_code(code: &Option<i64>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AiScoutError>;

/// Category of a per-source failure, as recorded in a crawl result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Parse,
    Protocol,
    Validation,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parse => "parse",
            Self::Protocol => "protocol",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AiScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a protocol error, optionally carrying a JSON-RPC error code.
    pub fn protocol(code: Option<i64>, msg: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The failure category this error is recorded under at the adapter boundary.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Parse { .. } => FailureKind::Parse,
            Self::Protocol { .. } => FailureKind::Protocol,
            Self::Validation { .. } => FailureKind::Validation,
            Self::Config { .. } | Self::Storage(_) | Self::Io { .. } => FailureKind::Internal,
        }
    }
}
