// Toy resource kinds and a read-counting file source shared by the
// integration tests.
#![allow(dead_code)]

use stock_cache::{Content, DecodeError, FileSource, MemorySource, Resource};
use std::cell::Cell;
use std::io;
use std::rc::Rc;

/// UTF-8 text. Payloads starting with `#corrupt` are rejected; payloads
/// starting with `#keep` report themselves as not auto-freed.
#[derive(Default, Debug)]
pub struct Text {
    pub body: String,
}

impl Resource for Text {
    const KIND: &'static str = "text";

    fn description(&self) -> String {
        format!("{} chars", self.body.chars().count())
    }

    fn clear(&mut self) {
        self.body.clear();
    }

    fn read(&mut self, content: &Content<'_>) -> Result<(), DecodeError> {
        let body = std::str::from_utf8(content.bytes())
            .map_err(|e| content.malformed(e.to_string()))?;
        if body.starts_with("#corrupt") {
            return Err(content.malformed("corrupt header"));
        }
        self.body = body.to_owned();
        Ok(())
    }

    fn write(&self, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(self.body.as_bytes())
    }

    fn is_auto_freed(&self) -> bool {
        !self.body.starts_with("#keep")
    }

    fn used_memory(&self) -> usize {
        self.body.len()
    }
}

/// Whitespace-separated `x y z` triples, one vertex per line.
#[derive(Default, Debug)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
}

impl Resource for Mesh {
    const KIND: &'static str = "mesh";

    fn description(&self) -> String {
        format!("{} vertices", self.vertices.len())
    }

    fn clear(&mut self) {
        self.vertices.clear();
    }

    fn read(&mut self, content: &Content<'_>) -> Result<(), DecodeError> {
        let text = std::str::from_utf8(content.bytes())
            .map_err(|e| content.malformed(e.to_string()))?;
        for (n, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let coords: Vec<f32> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|e| content.malformed(format!("line {}: {e}", n + 1)))?;
            match coords.as_slice() {
                &[x, y, z] => self.vertices.push([x, y, z]),
                _ => return Err(content.malformed(format!("line {}: expected 3 coords", n + 1))),
            }
        }
        Ok(())
    }

    fn write(&self, out: &mut dyn io::Write) -> io::Result<()> {
        for [x, y, z] in &self.vertices {
            writeln!(out, "{x} {y} {z}")?;
        }
        Ok(())
    }

    fn used_memory(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<[f32; 3]>()
    }
}

/// Wraps a `MemorySource` and counts reads, so hits (no I/O) can be told
/// apart from misses.
#[derive(Clone, Default)]
pub struct CountingSource {
    pub inner: MemorySource,
    reads: Rc<Cell<usize>>,
}

impl CountingSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Shared counter that survives moving the source into an overlay.
    pub fn counter(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl FileSource for CountingSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(path)
    }
}

pub fn text_files() -> CountingSource {
    CountingSource::new(
        MemorySource::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "bravo!")
            .with_file("File.txt", "mixed case")
            .with_file("keep.txt", "#keep me")
            .with_file("broken.txt", "#corrupt"),
    )
}
