//! Error taxonomy for calls against the catalog.

use std::fmt;

use thiserror::Error;

/// Discriminant shared by every error surfaced to callers of the catalog,
/// from input validation at the proxy down to malformed upstream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Timeout,
    Remote,
    Transport,
    Shape,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Remote => "remote",
            ErrorKind::Transport => "transport",
            ErrorKind::Shape => "shape",
        };
        f.write_str(name)
    }
}

/// Failure of a single catalog action call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog request timed out")]
    Timeout,

    /// The catalog answered with a non-2xx status, or with `success: false`.
    #[error("catalog returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body is missing required parts.
    #[error("invalid catalog response: {0}")]
    Shape(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Timeout => ErrorKind::Timeout,
            CatalogError::Remote { .. } => ErrorKind::Remote,
            CatalogError::Transport(_) => ErrorKind::Transport,
            CatalogError::Shape(_) => ErrorKind::Shape,
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CatalogError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        CatalogError::Shape(msg.into())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CatalogError::Timeout;
        }
        if err.is_decode() {
            return CatalogError::Shape(err.to_string());
        }
        CatalogError::Transport(err.to_string())
    }
}
