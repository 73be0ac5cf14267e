//! The capability set a resource kind exposes to the cache.

use crate::error::DecodeError;
use std::io;

/// Resolved content handed to [`Resource::read`].
#[derive(Copy, Clone, Debug)]
pub struct Content<'a> {
    path: &'a str,
    bytes: &'a [u8],
}

impl<'a> Content<'a> {
    pub fn new(path: &'a str, bytes: &'a [u8]) -> Self {
        Self { path, bytes }
    }

    /// Logical path the bytes were resolved from.
    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build the error a kind returns when it rejects this content.
    pub fn malformed(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            path: self.path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A decoded, heavyweight asset kind (mesh, texture, sound, ...).
///
/// The cache creates instances with `Default`, fills them through `read`,
/// and calls `clear` right before an instance is destroyed.
pub trait Resource: Default {
    /// Kind name used in logs and diagnostics.
    const KIND: &'static str;

    /// Human-readable summary of the decoded contents.
    fn description(&self) -> String;

    /// Release decoded data, returning the instance to its empty state.
    fn clear(&mut self);

    /// Decode `content` into `self`.
    fn read(&mut self, content: &Content<'_>) -> Result<(), DecodeError>;

    /// Encode `self` in the kind's own format.
    fn write(&self, out: &mut dyn io::Write) -> io::Result<()>;

    /// Whether the kind considers this instance eligible for automatic disposal.
    fn is_auto_freed(&self) -> bool {
        true
    }

    /// Self-reported footprint in bytes.
    fn used_memory(&self) -> usize;
}
