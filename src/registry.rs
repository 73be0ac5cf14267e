//! Registry: at most one cache per resource kind, plus the shared file source.
//!
//! Caches of unrelated kinds are stored type-erased behind `ErasedCache` and
//! recovered by `TypeId` downcast. A kind that was never registered is a
//! normal state (tools and shutdown paths construct only what they need):
//! lookups return [`Unavailable`], and routed operations degrade to logged
//! no-ops or empty results.

use crate::cache::ResourceCache;
use crate::entry::{Administrator, Handle};
use crate::error::{ObtainError, SaveError, Unavailable};
use crate::files::Overlay;
use crate::name_index::IndexConfig;
use crate::resource::Resource;
use core::any::{Any, TypeId};
use hashbrown::HashMap;
use std::io;
use tracing::{debug, warn};

/// Kind-independent view of a `ResourceCache<R>`.
trait ErasedCache {
    fn kind(&self) -> &'static str;
    fn administers(&self, handle: Handle) -> bool;
    fn free_unused(&mut self) -> usize;
    fn used_memory(&self) -> usize;
    fn total_count(&self) -> usize;
    fn used_count(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<R: Resource + 'static> ErasedCache for ResourceCache<R> {
    fn kind(&self) -> &'static str {
        R::KIND
    }
    fn administers(&self, handle: Handle) -> bool {
        Administrator::administers(self, handle)
    }
    fn free_unused(&mut self) -> usize {
        ResourceCache::free_unused(self)
    }
    fn used_memory(&self) -> usize {
        ResourceCache::used_memory(self)
    }
    fn total_count(&self) -> usize {
        ResourceCache::total_count(self)
    }
    fn used_count(&self) -> usize {
        ResourceCache::used_count(self)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

type Caches = HashMap<TypeId, Box<dyn ErasedCache>>;

fn downcast_mut<R: Resource + 'static>(
    caches: &mut Caches,
) -> Result<&mut ResourceCache<R>, Unavailable> {
    caches
        .get_mut(&TypeId::of::<R>())
        .and_then(|c| c.as_any_mut().downcast_mut::<ResourceCache<R>>())
        .ok_or(Unavailable { kind: R::KIND })
}

#[derive(Default)]
pub struct Registry {
    files: Overlay,
    caches: Caches,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: Overlay) -> Self {
        Self {
            files,
            caches: HashMap::new(),
        }
    }

    pub fn files(&self) -> &Overlay {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut Overlay {
        &mut self.files
    }

    /// Construct the cache for kind `R`. Returns false, keeping the existing
    /// cache, if one is already registered.
    pub fn register<R: Resource + 'static>(&mut self, config: IndexConfig) -> bool {
        let id = TypeId::of::<R>();
        if self.caches.contains_key(&id) {
            return false;
        }
        self.caches.insert(id, Box::new(ResourceCache::<R>::with_config(config)));
        debug!(kind = R::KIND, "registered resource cache");
        true
    }

    /// Remove and return the cache for kind `R`.
    pub fn unregister<R: Resource + 'static>(&mut self) -> Option<ResourceCache<R>> {
        let erased = self.caches.remove(&TypeId::of::<R>())?;
        match erased.into_any().downcast::<ResourceCache<R>>() {
            Ok(cache) => Some(*cache),
            Err(_) => panic!("cache registered under the TypeId of another kind"),
        }
    }

    pub fn is_registered<R: Resource + 'static>(&self) -> bool {
        self.caches.contains_key(&TypeId::of::<R>())
    }

    pub fn cache<R: Resource + 'static>(&self) -> Result<&ResourceCache<R>, Unavailable> {
        self.caches
            .get(&TypeId::of::<R>())
            .and_then(|c| c.as_any().downcast_ref::<ResourceCache<R>>())
            .ok_or(Unavailable { kind: R::KIND })
    }

    pub fn cache_mut<R: Resource + 'static>(
        &mut self,
    ) -> Result<&mut ResourceCache<R>, Unavailable> {
        downcast_mut::<R>(&mut self.caches)
    }

    /// Obtain `path` from the kind's cache, reading through the registry's
    /// file overlay on a miss.
    pub fn obtain<R: Resource + 'static>(&mut self, path: &str) -> Result<Handle, ObtainError> {
        let Self { files, caches } = self;
        let cache = downcast_mut::<R>(caches).inspect_err(|e| {
            warn!(kind = e.kind, path, "obtain on unavailable resource cache");
        })?;
        Ok(cache.obtain(path, &*files)?)
    }

    /// Decode `handle`'s resource again from the registry's file overlay.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle or one issued by another cache of the kind.
    pub fn reload<R: Resource + 'static>(&mut self, handle: Handle) -> Result<(), ObtainError> {
        let Self { files, caches } = self;
        let cache = downcast_mut::<R>(caches).inspect_err(|e| {
            warn!(kind = e.kind, "reload on unavailable resource cache");
        })?;
        Ok(cache.reload(handle, &*files)?)
    }

    /// Encode `handle`'s resource through the kind's write contract.
    pub fn save<R: Resource + 'static>(
        &self,
        handle: Handle,
        out: &mut dyn io::Write,
    ) -> Result<(), SaveError> {
        let cache = self.cache::<R>().inspect_err(|e| {
            warn!(kind = e.kind, "save on unavailable resource cache");
        })?;
        Ok(cache.save(handle, out)?)
    }

    /// Release through the kind's cache; a logged no-op if it is unavailable.
    pub fn release<R: Resource + 'static>(&mut self, handle: Handle) {
        match self.cache_mut::<R>() {
            Ok(cache) => cache.release(handle),
            Err(e) => warn!(kind = e.kind, "release on unavailable resource cache ignored"),
        }
    }

    /// Sweep the kind's cache; 0 if it is unavailable.
    pub fn free_unused<R: Resource + 'static>(&mut self) -> usize {
        match self.cache_mut::<R>() {
            Ok(cache) => cache.free_unused(),
            Err(e) => {
                warn!(kind = e.kind, "sweep on unavailable resource cache ignored");
                0
            }
        }
    }

    /// Sweep every registered cache. Returns the total number freed.
    pub fn free_all_unused(&mut self) -> usize {
        self.caches.values_mut().map(|c| c.free_unused()).sum()
    }

    pub fn get<R: Resource + 'static>(&self, handle: Handle) -> Option<&R> {
        match self.cache::<R>() {
            Ok(cache) => cache.get(handle),
            Err(e) => {
                warn!(kind = e.kind, "get on unavailable resource cache");
                None
            }
        }
    }

    pub fn used_memory<R: Resource + 'static>(&self) -> usize {
        self.query::<R, _>(ResourceCache::used_memory)
    }

    pub fn total_count<R: Resource + 'static>(&self) -> usize {
        self.query::<R, _>(ResourceCache::total_count)
    }

    pub fn used_count<R: Resource + 'static>(&self) -> usize {
        self.query::<R, _>(ResourceCache::used_count)
    }

    fn query<R, F>(&self, f: F) -> usize
    where
        R: Resource + 'static,
        F: FnOnce(&ResourceCache<R>) -> usize,
    {
        match self.cache::<R>() {
            Ok(cache) => f(cache),
            Err(e) => {
                warn!(kind = e.kind, "query on unavailable resource cache");
                0
            }
        }
    }

    /// Footprint of every registered cache.
    pub fn total_memory(&self) -> usize {
        self.caches.values().map(|c| c.used_memory()).sum()
    }

    /// `(kind, total, used, bytes)` per registered cache, sorted by kind.
    pub fn summary(&self) -> Vec<(&'static str, usize, usize, usize)> {
        let mut rows: Vec<_> = self
            .caches
            .values()
            .map(|c| (c.kind(), c.total_count(), c.used_count(), c.used_memory()))
            .collect();
        rows.sort_unstable_by_key(|r| r.0);
        rows
    }

    /// Whether any registered cache still administers `handle`.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.caches.values().any(|c| c.administers(handle))
    }
}

impl Administrator for Registry {
    fn administers(&self, handle: Handle) -> bool {
        self.is_live(handle)
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kinds: Vec<&str> = self.caches.values().map(|c| c.kind()).collect();
        f.debug_struct("Registry")
            .field("files", &self.files)
            .field("kinds", &kinds)
            .finish()
    }
}
