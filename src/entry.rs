//! Cache entries: usage counting and the back-reference to the administering cache.
//!
//! A resident entry is owned by exactly one `ResourceCache`. Consumers hold
//! `Handle`s, which pair the cache identity with a generational slot key, so
//! a handle that outlives its entry (or is presented to another cache) is
//! detected structurally instead of aliasing whatever took the slot.

use crate::resource::Resource;
use slotmap::DefaultKey;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one cache instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CacheId(u64);

impl CacheId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        CacheId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for CacheId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cache#{}", self.0)
    }
}

/// Non-owning reference to a cache entry: `(cache identity, slot key)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    cache: CacheId,
    key: DefaultKey,
}

impl Handle {
    pub(crate) fn new(cache: CacheId, key: DefaultKey) -> Self {
        Self { cache, key }
    }

    pub(crate) fn raw_key(&self) -> DefaultKey {
        self.key
    }

    /// Identity of the cache that issued this handle.
    pub fn cache_id(&self) -> CacheId {
        self.cache
    }
}

/// Answers whether a handle still designates a live, cache-administered entry.
pub trait Administrator {
    fn administers(&self, handle: Handle) -> bool;
}

/// Count of outstanding obtains not yet matched by a release.
#[derive(Debug, Default)]
pub struct UsageCount {
    count: usize,
}

impl UsageCount {
    pub fn new(initial: usize) -> Self {
        Self { count: initial }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        self.count > 0
    }

    #[inline]
    pub fn acquire(&mut self) {
        let n = self.count.wrapping_add(1);
        if n == 0 {
            // Abort on overflow, like Rc.
            std::process::abort();
        }
        self.count = n;
    }

    /// Returns true if the count is now zero.
    ///
    /// # Panics
    ///
    /// Panics on release of an unused counter (double release).
    #[inline]
    pub fn release(&mut self) -> bool {
        assert!(self.count > 0, "usage counter underflow: double release");
        self.count -= 1;
        self.count == 0
    }
}

/// A resource instance together with its cache bookkeeping.
#[derive(Debug)]
pub struct CacheEntry<R> {
    name: String,
    resource: R,
    usage: UsageCount,
    owner: Option<Handle>,
}

impl<R: Resource> CacheEntry<R> {
    /// Entry registered by a cache on first obtain.
    pub(crate) fn resident(name: &str, resource: R, owner: Handle) -> Self {
        Self {
            name: name.to_owned(),
            resource,
            usage: UsageCount::new(1),
            owner: Some(owner),
        }
    }

    /// A privately held instance that no cache administers.
    pub fn detached(name: impl Into<String>, resource: R) -> Self {
        Self {
            name: name.into(),
            resource,
            usage: UsageCount::new(0),
            owner: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn usage(&self) -> usize {
        self.usage.get()
    }

    pub fn is_used(&self) -> bool {
        self.usage.is_used()
    }

    /// The cache slot this entry was registered under, if any.
    pub fn owner(&self) -> Option<Handle> {
        self.owner
    }

    pub fn is_auto_freed(&self) -> bool {
        self.resource.is_auto_freed()
    }

    pub fn used_memory(&self) -> usize {
        self.resource.used_memory()
    }

    pub(crate) fn acquire(&mut self) {
        self.usage.acquire();
    }

    pub(crate) fn release(&mut self) -> bool {
        self.usage.release()
    }

    /// Clear and drop a resource the owning cache just unlinked.
    pub(crate) fn dispose(mut self) {
        debug_assert!(!self.usage.is_used());
        self.owner = None;
        self.resource.clear();
    }

    /// Destroy the resource outside of any cache.
    ///
    /// # Panics
    ///
    /// Panics if the entry still has users, or if its back-reference still
    /// designates an entry `admin` administers.
    pub fn destroy_unmanaged<A>(mut self, admin: &A)
    where
        A: Administrator + ?Sized,
    {
        assert!(
            !self.usage.is_used(),
            "direct destruction of {:?} with {} outstanding users",
            self.name,
            self.usage.get()
        );
        if let Some(owner) = self.owner {
            assert!(
                !admin.administers(owner),
                "direct destruction of {:?} while {} still administers it",
                self.name,
                owner.cache_id()
            );
        }
        self.resource.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_count_tracks_acquire_release() {
        let mut c = UsageCount::new(1);
        c.acquire();
        assert_eq!(c.get(), 2);
        assert!(!c.release());
        assert!(c.release());
        assert!(!c.is_used());
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn usage_count_underflow_panics() {
        let mut c = UsageCount::new(0);
        c.release();
    }

    #[test]
    fn cache_ids_are_unique() {
        let a = CacheId::next();
        let b = CacheId::next();
        assert_ne!(a, b);
    }
}
