//! NameIndex: compartmentalized name -> element lookup with incremental growth.
//!
//! The index is a fixed number of compartments, each a growable array of
//! slots. A name hashes to a stable 32-bit key; `key % compartments` picks
//! the compartment, which is then scanned linearly (key first, exact name
//! second). Removed slots are cleared in place and never compacted until the
//! next expansion or `reset`.
//!
//! Elements are small `Copy` identifiers (the cache uses slot-map keys). The
//! index does not own names; callers pass a `name_of` closure that resolves
//! an element to its name, the same way `HashTable` probes resolve keys
//! through the backing storage.

use core::hash::{BuildHasher, Hasher};
use rustc_hash::FxBuildHasher;

/// Whether names compare with or without ASCII case folding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CaseSensitivity {
    Sensitive,
    #[default]
    Insensitive,
}

impl CaseSensitivity {
    #[inline]
    pub fn names_equal(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }

    #[inline]
    fn fold(self, b: u8) -> u8 {
        match self {
            CaseSensitivity::Sensitive => b,
            CaseSensitivity::Insensitive => b.to_ascii_lowercase(),
        }
    }
}

/// Allocation parameters for a [`NameIndex`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndexConfig {
    /// Number of compartments; fixed for the lifetime of the configuration.
    pub compartments: usize,
    /// Initial slot count of every compartment.
    pub slots_per_compartment: usize,
    /// Slots added to every compartment when one of them overflows.
    pub growth_step: usize,
    pub case: CaseSensitivity,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            compartments: 50,
            slots_per_compartment: 2,
            growth_step: 2,
            case: CaseSensitivity::Insensitive,
        }
    }
}

impl IndexConfig {
    pub fn with_compartments(mut self, compartments: usize) -> Self {
        self.compartments = compartments;
        self
    }

    pub fn with_slots_per_compartment(mut self, slots: usize) -> Self {
        self.slots_per_compartment = slots;
        self
    }

    pub fn with_growth_step(mut self, step: usize) -> Self {
        self.growth_step = step;
        self
    }

    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }
}

#[derive(Copy, Clone, Debug)]
struct Slot<E> {
    key: u32,
    element: Option<E>,
}

impl<E> Slot<E> {
    const EMPTY: Self = Slot {
        key: 0,
        element: None,
    };
}

/// Position of a slot inside the index.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SlotPos {
    pub compartment: usize,
    pub slot: usize,
}

/// Outcome of probing one compartment for a `(key, name)` pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Probe {
    /// An occupied slot whose element carries the probed name.
    Found(SlotPos),
    /// The name is absent; this is the first empty slot of the compartment.
    Vacant(SlotPos),
    /// The name is absent and the compartment has no empty slot.
    Full,
}

pub struct NameIndex<E, S = FxBuildHasher> {
    hasher: S,
    config: IndexConfig,
    slots_per_compartment: usize,
    compartments: Vec<Vec<Slot<E>>>,
    len: usize,
}

impl<E> NameIndex<E>
where
    E: Copy + Eq,
{
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher)
    }

    pub fn with_config(config: IndexConfig) -> Self {
        let mut index = Self::new();
        index.configure(config);
        index
    }
}

impl<E> Default for NameIndex<E>
where
    E: Copy + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> NameIndex<E, S>
where
    E: Copy + Eq,
    S: BuildHasher,
{
    /// Create an index with the default configuration and a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        let mut index = Self {
            hasher,
            config: IndexConfig::default(),
            slots_per_compartment: 0,
            compartments: Vec::new(),
            len: 0,
        };
        index.configure(IndexConfig::default());
        index
    }

    /// Set the allocation parameters and allocate every compartment.
    ///
    /// # Panics
    ///
    /// Panics if the index holds any element, if `compartments` is zero or if
    /// `growth_step` is zero.
    pub fn configure(&mut self, config: IndexConfig) {
        assert!(
            self.len == 0,
            "NameIndex::configure called on a non-empty index"
        );
        assert!(config.compartments > 0, "NameIndex needs at least one compartment");
        assert!(config.growth_step > 0, "NameIndex growth step must be positive");
        self.config = config;
        self.slots_per_compartment = config.slots_per_compartment;
        self.compartments = (0..config.compartments)
            .map(|_| vec![Slot::EMPTY; config.slots_per_compartment])
            .collect();
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Stable 32-bit key over the (case-folded, if configured) name bytes.
    pub fn hash(&self, name: &str) -> u32 {
        let mut h = self.hasher.build_hasher();
        for b in name.bytes() {
            h.write_u8(self.config.case.fold(b));
        }
        let x = h.finish();
        (x ^ (x >> 32)) as u32
    }

    #[inline]
    fn compartment_of(&self, key: u32) -> usize {
        key as usize % self.compartments.len()
    }

    /// Scan the compartment selected by `key` for `name`.
    pub fn find_slot<'a, F>(&self, key: u32, name: &str, name_of: F) -> Probe
    where
        F: Fn(E) -> &'a str,
    {
        let compartment = self.compartment_of(key);
        let mut vacant = None;
        // Removed slots sit between live ones; the whole compartment is scanned.
        for (i, slot) in self.compartments[compartment].iter().enumerate() {
            match slot.element {
                Some(e) => {
                    if slot.key == key && self.config.case.names_equal(name_of(e), name) {
                        return Probe::Found(SlotPos {
                            compartment,
                            slot: i,
                        });
                    }
                }
                None => {
                    if vacant.is_none() {
                        vacant = Some(SlotPos {
                            compartment,
                            slot: i,
                        });
                    }
                }
            }
        }
        match vacant {
            Some(pos) => Probe::Vacant(pos),
            None => Probe::Full,
        }
    }

    pub fn find<'a, F>(&self, name: &str, name_of: F) -> Option<E>
    where
        F: Fn(E) -> &'a str,
    {
        match self.find_slot(self.hash(name), name, name_of) {
            Probe::Found(pos) => self.compartments[pos.compartment][pos.slot].element,
            _ => None,
        }
    }

    /// Flat slot number of `name` (`compartment * slots_per_compartment + slot`).
    pub fn find_index<'a, F>(&self, name: &str, name_of: F) -> Option<usize>
    where
        F: Fn(E) -> &'a str,
    {
        match self.find_slot(self.hash(name), name, name_of) {
            Probe::Found(pos) => Some(pos.compartment * self.slots_per_compartment + pos.slot),
            _ => None,
        }
    }

    pub fn contains<'a, F>(&self, name: &str, name_of: F) -> bool
    where
        F: Fn(E) -> &'a str,
    {
        self.find(name, name_of).is_some()
    }

    /// Store `element` under `name`. Names must be unique; the caller checks.
    ///
    /// A full compartment triggers one expansion of every compartment
    /// followed by a single retry.
    ///
    /// # Panics
    ///
    /// Panics if the element cannot be placed after expansion.
    pub fn add(&mut self, name: &str, element: E) {
        let key = self.hash(name);
        if !self.place(key, element) {
            self.expand();
            if !self.place(key, element) {
                panic!("NameIndex: no free slot for {name:?} after expansion");
            }
        }
        self.len += 1;
    }

    fn place(&mut self, key: u32, element: E) -> bool {
        let compartment = self.compartment_of(key);
        match self.compartments[compartment]
            .iter_mut()
            .find(|s| s.element.is_none())
        {
            Some(slot) => {
                *slot = Slot {
                    key,
                    element: Some(element),
                };
                true
            }
            None => false,
        }
    }

    /// Grow every compartment by `growth_step` and reinsert all elements.
    fn expand(&mut self) {
        let stored: Vec<(u32, E)> = self
            .compartments
            .iter()
            .flatten()
            .filter_map(|s| s.element.map(|e| (s.key, e)))
            .collect();

        self.slots_per_compartment += self.config.growth_step;
        let size = self.slots_per_compartment;
        for compartment in &mut self.compartments {
            compartment.clear();
            compartment.resize(size, Slot::EMPTY);
        }
        for (key, element) in stored {
            if !self.place(key, element) {
                panic!("NameIndex: element lost while rehashing");
            }
        }
        tracing::debug!(
            slots_per_compartment = size,
            capacity = self.capacity(),
            len = self.len,
            "name index expanded"
        );
    }

    /// Clear the slot holding `element`. Returns whether it was present.
    pub fn remove(&mut self, name: &str, element: E) -> bool {
        let key = self.hash(name);
        let compartment = self.compartment_of(key);
        match self.compartments[compartment]
            .iter_mut()
            .find(|s| s.element == Some(element))
        {
            Some(slot) => {
                *slot = Slot::EMPTY;
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Clear every slot, keeping the allocated capacity.
    pub fn reset(&mut self) {
        for slot in self.compartments.iter_mut().flatten() {
            *slot = Slot::EMPTY;
        }
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.compartments.len() * self.slots_per_compartment
    }

    pub fn slots_per_compartment(&self) -> usize {
        self.slots_per_compartment
    }

    /// Occupied / total slots. Informational only.
    pub fn efficiency(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            cap => self.len as f64 / cap as f64,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.compartments
            .iter()
            .flatten()
            .filter_map(|s| s.element)
    }
}
