//! File access boundary: resolve a logical path to bytes.
//!
//! The cache only ever asks for "the bytes at this path". Where they come
//! from (a directory on disk, an in-memory table, a stack of overlays) is the
//! business of the [`FileSource`] handed to it.

use hashbrown::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Something that can read the bytes behind a logical path.
///
/// An absent path is reported as `io::ErrorKind::NotFound`; overlays rely on
/// that to fall through to lower-priority sources.
pub trait FileSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

impl<T: FileSource + ?Sized> FileSource for &T {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }
}

impl<T: FileSource + ?Sized> FileSource for Box<T> {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such resource: {path}"))
}

/// Reads logical paths relative to a directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(path);
        // Logical paths stay inside the root.
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes source root: {path}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl FileSource for DirectorySource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }
}

/// In-memory table of path -> bytes.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSource for MemorySource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| not_found(path))
    }
}

/// Priority-ordered stack of sources. A source pushed later shadows every
/// earlier source for the paths it provides.
#[derive(Default)]
pub struct Overlay {
    sources: Vec<Box<dyn FileSource>>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl FileSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn with(mut self, source: impl FileSource + 'static) -> Self {
        self.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FileSource for Overlay {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        for source in self.sources.iter().rev() {
            match source.read(path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                other => return other,
            }
        }
        Err(not_found(path))
    }
}

impl core::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Overlay")
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reports_missing_as_not_found() {
        let src = MemorySource::new().with_file("a.txt", "alpha");
        assert_eq!(src.read("a.txt").unwrap(), b"alpha");
        let err = src.read("b.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    /// Invariant: later sources shadow earlier ones; misses fall through.
    #[test]
    fn overlay_prefers_latest_source() {
        let base = MemorySource::new()
            .with_file("shared.txt", "base")
            .with_file("base_only.txt", "b");
        let patch = MemorySource::new()
            .with_file("shared.txt", "patch")
            .with_file("patch_only.txt", "p");
        let overlay = Overlay::new().with(base).with(patch);

        assert_eq!(overlay.read("shared.txt").unwrap(), b"patch");
        assert_eq!(overlay.read("base_only.txt").unwrap(), b"b");
        assert_eq!(overlay.read("patch_only.txt").unwrap(), b"p");
        assert_eq!(
            overlay.read("nowhere.txt").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn empty_overlay_finds_nothing() {
        let overlay = Overlay::new();
        assert!(overlay.is_empty());
        assert_eq!(
            overlay.read("x").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn directory_source_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/crate.mdl"), b"mdl").unwrap();

        let src = DirectorySource::new(dir.path());
        assert_eq!(src.read("models/crate.mdl").unwrap(), b"mdl");
        assert_eq!(
            src.read("models/missing.mdl").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn directory_source_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let src = DirectorySource::new(dir.path());
        assert_eq!(
            src.read("../secret").unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}
