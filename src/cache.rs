//! ResourceCache: obtain/release/evict over one resource kind.
//!
//! Storage is a slot map of `CacheEntry<R>` (generational keys) plus an
//! insertion-order list and a `NameIndex` over the same keys. The three are
//! kept in lockstep by the cache's own methods; a key present in one and not
//! the others is a bug and panics where detected.

use crate::entry::{Administrator, CacheEntry, CacheId, Handle};
use crate::error::DecodeError;
use crate::files::FileSource;
use crate::name_index::{IndexConfig, NameIndex};
use crate::resource::{Content, Resource};
use core::hash::BuildHasher;
use rustc_hash::FxBuildHasher;
use slotmap::{DefaultKey, SlotMap};
use std::io;
use tracing::{debug, trace, warn};

pub struct ResourceCache<R: Resource, S = FxBuildHasher> {
    id: CacheId,
    entries: SlotMap<DefaultKey, CacheEntry<R>>,
    order: Vec<DefaultKey>,
    index: NameIndex<DefaultKey, S>,
}

impl<R: Resource> ResourceCache<R> {
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    pub fn with_config(config: IndexConfig) -> Self {
        Self::with_hasher(config, FxBuildHasher)
    }
}

impl<R: Resource> Default for ResourceCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn name_of<R: Resource>(entries: &SlotMap<DefaultKey, CacheEntry<R>>, key: DefaultKey) -> &str {
    match entries.get(key) {
        Some(entry) => entry.name(),
        None => panic!("name index refers to an entry missing from the collection"),
    }
}

impl<R, S> ResourceCache<R, S>
where
    R: Resource,
    S: BuildHasher,
{
    pub fn with_hasher(config: IndexConfig, hasher: S) -> Self {
        let mut index = NameIndex::with_hasher(hasher);
        index.configure(config);
        Self {
            id: CacheId::next(),
            entries: SlotMap::with_key(),
            order: Vec::new(),
            index,
        }
    }

    pub fn id(&self) -> CacheId {
        self.id
    }

    fn lookup(&self, path: &str) -> Option<DefaultKey> {
        self.index.find(path, |k| name_of(&self.entries, k))
    }

    fn handle(&self, key: DefaultKey) -> Handle {
        Handle::new(self.id, key)
    }

    /// Slot key for a handle this cache issued; `None` for foreign handles.
    fn own_key(&self, handle: Handle) -> Option<DefaultKey> {
        (handle.cache_id() == self.id).then(|| handle.raw_key())
    }

    fn check_owner(&self, handle: Handle, op: &str) -> DefaultKey {
        assert!(
            handle.cache_id() == self.id,
            "{op}: handle issued by {} presented to {}",
            handle.cache_id(),
            self.id
        );
        handle.raw_key()
    }

    fn expect_entry(&self, handle: Handle, op: &str) -> &CacheEntry<R> {
        let key = self.check_owner(handle, op);
        match self.entries.get(key) {
            Some(entry) => entry,
            None => panic!("{op}: stale handle, the entry was already evicted"),
        }
    }

    fn expect_entry_mut(&mut self, handle: Handle, op: &str) -> &mut CacheEntry<R> {
        let key = self.check_owner(handle, op);
        match self.entries.get_mut(key) {
            Some(entry) => entry,
            None => panic!("{op}: stale handle, the entry was already evicted"),
        }
    }

    /// Return the entry registered under `path`, decoding it on first use.
    ///
    /// A hit bumps the usage counter and performs no I/O. A miss reads the
    /// bytes from `files`, decodes a fresh instance and registers it with a
    /// usage of one. Nothing is registered when reading or decoding fails.
    pub fn obtain<F>(&mut self, path: &str, files: &F) -> Result<Handle, DecodeError>
    where
        F: FileSource + ?Sized,
    {
        if let Some(key) = self.lookup(path) {
            let entry = &mut self.entries[key];
            entry.acquire();
            trace!(kind = R::KIND, path, usage = entry.usage(), "cache hit");
            return Ok(self.handle(key));
        }

        let bytes = files
            .read(path)
            .map_err(|e| DecodeError::from_io(path, e))?;
        let mut resource = R::default();
        resource.read(&Content::new(path, &bytes))?;
        debug!(
            kind = R::KIND,
            path,
            bytes = resource.used_memory(),
            "decoded resource"
        );

        let id = self.id;
        let key = self
            .entries
            .insert_with_key(|k| CacheEntry::resident(path, resource, Handle::new(id, k)));
        self.order.push(key);
        self.index.add(path, key);
        Ok(self.handle(key))
    }

    /// Drop one use of the entry. The entry stays resident until a sweep.
    ///
    /// # Panics
    ///
    /// Panics on double release, on a stale handle and on a handle issued by
    /// another cache.
    pub fn release(&mut self, handle: Handle) {
        let entry = self.expect_entry_mut(handle, "release");
        entry.release();
        trace!(
            kind = R::KIND,
            path = entry.name(),
            usage = entry.usage(),
            "released"
        );
    }

    /// Destroy every entry with no outstanding users. Returns how many.
    pub fn free_unused(&mut self) -> usize {
        let entries = &mut self.entries;
        let index = &mut self.index;
        let mut freed = 0;
        self.order.retain(|&key| {
            let used = match entries.get(key) {
                Some(entry) => entry.is_used(),
                None => panic!("collection order refers to a missing entry"),
            };
            if used {
                return true;
            }
            let entry = entries.remove(key).expect("entry checked present above");
            assert!(
                index.remove(entry.name(), key),
                "evicted entry {:?} was not in the name index",
                entry.name()
            );
            debug!(kind = R::KIND, path = entry.name(), "freed unused resource");
            entry.dispose();
            freed += 1;
            false
        });
        freed
    }

    /// Unlink a single unused entry and hand it to the caller instead of
    /// destroying it. The entry keeps its back-reference.
    ///
    /// Returns `None` for stale or foreign handles and for entries in use.
    pub fn take_unused(&mut self, handle: Handle) -> Option<CacheEntry<R>> {
        let key = self.own_key(handle)?;
        if self.entries.get(key)?.is_used() {
            return None;
        }
        let entry = self.entries.remove(key)?;
        self.order.retain(|&k| k != key);
        assert!(
            self.index.remove(entry.name(), key),
            "detached entry {:?} was not in the name index",
            entry.name()
        );
        Some(entry)
    }

    /// Clear the resource and decode it again from `files`, in place.
    ///
    /// If the bytes cannot be read the resource is left untouched; if they
    /// cannot be decoded the resource is left cleared. The usage counter and
    /// the handle stay valid either way.
    ///
    /// # Panics
    ///
    /// Panics on a stale or foreign handle.
    pub fn reload<F>(&mut self, handle: Handle, files: &F) -> Result<(), DecodeError>
    where
        F: FileSource + ?Sized,
    {
        let entry = self.expect_entry_mut(handle, "reload");
        let path = entry.name().to_owned();
        let bytes = files
            .read(&path)
            .map_err(|e| DecodeError::from_io(&path, e))?;
        let resource = entry.resource_mut();
        resource.clear();
        resource.read(&Content::new(&path, &bytes))?;
        debug!(kind = R::KIND, path = %path, "reloaded resource");
        Ok(())
    }

    /// Encode a resident resource through its write contract.
    ///
    /// # Panics
    ///
    /// Panics on a stale or foreign handle.
    pub fn save(&self, handle: Handle, out: &mut dyn io::Write) -> io::Result<()> {
        self.expect_entry(handle, "save").resource().write(out)
    }

    pub fn get(&self, handle: Handle) -> Option<&R> {
        self.entry(handle).map(CacheEntry::resource)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut R> {
        let key = self.own_key(handle)?;
        self.entries.get_mut(key).map(CacheEntry::resource_mut)
    }

    pub fn entry(&self, handle: Handle) -> Option<&CacheEntry<R>> {
        self.entries.get(self.own_key(handle)?)
    }

    pub fn usage(&self, handle: Handle) -> Option<usize> {
        self.entry(handle).map(CacheEntry::usage)
    }

    pub fn is_used(&self, handle: Handle) -> bool {
        self.entry(handle).is_some_and(CacheEntry::is_used)
    }

    /// Look up `path` without taking a use.
    pub fn find(&self, path: &str) -> Option<Handle> {
        self.lookup(path).map(|k| self.handle(k))
    }

    /// Position of `path` in the insertion-ordered collection.
    pub fn find_index(&self, path: &str) -> Option<usize> {
        let key = self.lookup(path)?;
        self.order.iter().position(|&k| k == key)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Sum of every resident entry's footprint, used or not.
    pub fn used_memory(&self) -> usize {
        self.entries.values().map(CacheEntry::used_memory).sum()
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    pub fn used_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_used()).count()
    }

    /// Entries whose kind reports them eligible for automatic disposal.
    /// Informational; `free_unused` does not consult it.
    pub fn auto_freed_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_auto_freed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> &NameIndex<DefaultKey, S> {
        &self.index
    }

    /// Live entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Handle, &CacheEntry<R>)> + '_ {
        self.order.iter().map(move |&k| {
            let entry = match self.entries.get(k) {
                Some(entry) => entry,
                None => panic!("collection order refers to a missing entry"),
            };
            (self.handle(k), entry)
        })
    }

    /// Write one line per entry followed by the totals.
    pub fn dump_memory_usage<W: io::Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{} cache ({}):", R::KIND, self.id)?;
        for (_, entry) in self.entries() {
            writeln!(
                out,
                "{:>5} {:>10}  {}  {}",
                entry.usage(),
                entry.used_memory(),
                entry.name(),
                entry.resource().description()
            )?;
        }
        writeln!(
            out,
            "total {} entries, {} in use, {} bytes",
            self.total_count(),
            self.used_count(),
            self.used_memory()
        )
    }
}

impl<R, S> Administrator for ResourceCache<R, S>
where
    R: Resource,
    S: BuildHasher,
{
    fn administers(&self, handle: Handle) -> bool {
        self.own_key(handle).is_some_and(|k| self.entries.contains_key(k))
    }
}

impl<R: Resource, S> core::fmt::Debug for ResourceCache<R, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("kind", &R::KIND)
            .field("id", &self.id)
            .field("total_count", &self.entries.len())
            .finish()
    }
}

impl<R: Resource, S> Drop for ResourceCache<R, S> {
    fn drop(&mut self) {
        let in_use = self.entries.values().filter(|e| e.is_used()).count();
        if in_use > 0 {
            warn!(
                kind = R::KIND,
                cache = %self.id,
                in_use,
                "resource cache torn down with entries still in use"
            );
        }
        for (_, mut entry) in self.entries.drain() {
            entry.resource_mut().clear();
        }
    }
}
