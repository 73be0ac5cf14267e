//! stock-cache: a disk-backed resource cache keyed by logical path, with
//! usage counting and explicit eviction sweeps.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: load heavyweight decoded assets on demand, share one decoded
//!   instance between every user of the same path, and free instances only
//!   when an external caller asks for a sweep.
//! - Layers:
//!   - NameIndex<E, S>: fixed set of compartments, each a growable slot
//!     array; stable 32-bit keys, linear probe within a compartment, full
//!     rehash on growth.
//!   - ResourceCache<R, S>: slot-map arena of `CacheEntry<R>` plus the
//!     NameIndex and an insertion-order list; implements obtain/release/
//!     free_unused and memory accounting for one resource kind.
//!   - Registry: at most one cache per kind, type-erased and recovered by
//!     `TypeId`; unregistered kinds degrade to logged no-ops.
//!
//! Constraints
//! - Single-threaded: every mutation goes through `&mut self`; callers that
//!   share a cache across threads supply their own lock.
//! - Synchronous: a miss reads and decodes before `obtain` returns.
//! - Names are unique per cache; `obtain` always looks up before inserting.
//!
//! Lifetime model
//! - A `Handle` is `(cache identity, generational slot key)`. It is the
//!   back-reference from consumers (and from detached entries) to the cache
//!   administering the resource. Stale handles never alias a later entry.
//! - Usage counting is explicit: `obtain` adds one, `release` removes one.
//!   Reaching zero does not destroy anything; `free_unused` does.
//! - Destroying a resource outside a cache (`CacheEntry::destroy_unmanaged`)
//!   asserts it has no users and that no live cache still administers it.
//!
//! Failure boundaries
//! - `DecodeError` (missing file, I/O, malformed payload) is returned to the
//!   caller and leaves the cache unchanged.
//! - Double release, stale or foreign handles on release, and any
//!   index/collection desynchronization panic.
//! - `Unavailable` reports a kind with no registered cache.
//!
//! Notes and non-goals
//! - Concrete formats live with each resource kind behind `Resource`.
//! - Auto-free eligibility is reported per entry but does not gate sweeps.
//! - File resolution is delegated to a `FileSource`; `Overlay` stacks
//!   sources so later ones shadow earlier ones.

mod cache;
mod entry;
mod error;
mod files;
pub mod name_index;
mod name_index_proptest;
mod registry;
mod resource;

// Public surface
pub use cache::ResourceCache;
pub use entry::{Administrator, CacheEntry, CacheId, Handle, UsageCount};
pub use error::{DecodeError, ObtainError, SaveError, Unavailable};
pub use files::{DirectorySource, FileSource, MemorySource, Overlay};
pub use name_index::{CaseSensitivity, IndexConfig, NameIndex};
pub use registry::Registry;
pub use resource::{Content, Resource};
