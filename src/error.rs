//! Error types for cache operations.
//!
//! Only these conditions are recoverable. Refcount misuse, stale handles and
//! index/collection desynchronization are bugs and panic at the point of
//! detection.

use std::io;
use thiserror::Error;

/// A resource could not be produced from its logical path.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No file source provides the path.
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// A file source failed while reading the path.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The bytes were read but the resource kind rejected them.
    #[error("malformed resource {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl DecodeError {
    pub(crate) fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => DecodeError::NotFound {
                path: path.to_owned(),
            },
            _ => DecodeError::Io {
                path: path.to_owned(),
                source: err,
            },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            DecodeError::NotFound { path }
            | DecodeError::Io { path, .. }
            | DecodeError::Malformed { path, .. } => path,
        }
    }
}

/// The registry holds no cache for a resource kind.
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
#[error("no cache registered for resource kind `{kind}`")]
pub struct Unavailable {
    pub kind: &'static str,
}

/// Failure of an obtain or reload routed through the registry.
#[derive(Debug, Error)]
pub enum ObtainError {
    #[error(transparent)]
    Unavailable(#[from] Unavailable),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failure of a save routed through the registry.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Unavailable(#[from] Unavailable),

    #[error("failed to write resource")]
    Io(#[from] io::Error),
}
