//! Cache of external strings keyed by native buffer identity.
//!
//! Each native string handed to the script heap gets at most one external
//! string object at a time. The cache remembers it through a weak reference,
//! so the heap alone decides when the object dies, and holds one native
//! reference per entry so the buffer (and its identity key) outlives the
//! object.
//!
//! ## Lifecycle
//!
//! ```text
//! resolve(s) ──miss──► new_external_string ──► make_weak(finalizer) ──► insert
//!     │                                                                   │
//!     └──hit──► to_local(weak)                         native ref +1 ◄────┘
//!
//! collector finds object unreachable ──► finalizer ──► remove entry,
//!                                                      clear last slot,
//!                                                      native ref -1
//! ```
//!
//! Entries leave the mapping only through their finalizer, through
//! [`StringCache::remove`] when the native string is being destroyed by other
//! means, or through [`StringCache::teardown`] when the owning heap shuts down.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::engine::{ExternalStringResource, ScriptHeap};
use crate::native::{NativeString, StringKey};
use crate::HeapError;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the last-access slot
    pub fast_hits: u64,
    /// Lookups answered by the mapping
    pub hits: u64,
    /// Lookups that had to create an external string
    pub misses: u64,
    /// External strings created and inserted
    pub creations: u64,
    /// Creations refused by the heap
    pub allocation_failures: u64,
    /// Entries removed by finalizers
    pub finalized: u64,
    /// Entries removed explicitly or by teardown
    pub removed: u64,
}

struct CacheEntry<W> {
    /// The cache's own native reference.
    string: NativeString,
    weak: W,
}

struct CacheState<W> {
    entries: FxHashMap<StringKey, CacheEntry<W>>,
    /// Most recently resolved entry; always present in `entries` when set.
    last: Option<(StringKey, W)>,
    stats: CacheStats,
}

impl<W> CacheState<W> {
    fn take_entry(&mut self, key: StringKey) -> Option<CacheEntry<W>> {
        let entry = self.entries.remove(&key)?;
        if self.last.as_ref().is_some_and(|(last, _)| *last == key) {
            self.last = None;
        }
        Some(entry)
    }
}

/// External string cache for one script heap.
///
/// The cache is bound to the heap it is first used with; passing a different
/// heap to later calls is a logic error.
///
/// Dropping the cache releases its native references but not its weak slots:
/// those stay in the heap, with finalizers that do nothing, until their
/// objects are collected. Call [`StringCache::teardown`] before dropping to
/// release them, or use [`Isolate`](crate::Isolate), which does so.
pub struct StringCache<H: ScriptHeap> {
    state: Rc<RefCell<CacheState<H::Weak>>>,
}

impl<H: ScriptHeap> StringCache<H> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(CacheState {
                entries: FxHashMap::default(),
                last: None,
                stats: CacheStats::default(),
            })),
        }
    }

    /// Get the heap representation of `string`, creating it on first use.
    ///
    /// Empty strings map to the heap's canonical empty string and never
    /// enter the cache.
    pub fn resolve(&self, heap: &mut H, string: &NativeString) -> Result<H::Handle, HeapError> {
        if string.is_empty() {
            return Ok(heap.empty_string());
        }

        let key = string.key();

        let stale = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;

            if let Some((last_key, weak)) = &state.last {
                if *last_key == key {
                    if let Some(handle) = heap.to_local(weak) {
                        state.stats.fast_hits += 1;
                        return Ok(handle);
                    }
                }
            }

            let cached = state.entries.get(&key).map(|entry| entry.weak.clone());
            if let Some(weak) = cached {
                if let Some(handle) = heap.to_local(&weak) {
                    state.last = Some((key, weak));
                    state.stats.hits += 1;
                    return Ok(handle);
                }

                debug_assert!(false, "string cache entry outlived its heap object");
                tracing::error!(
                    "String cache entry for {:?} outlived its heap object, recreating",
                    key
                );
            }

            state.stats.misses += 1;
            state.take_entry(key)
        };

        // No borrow is held from here on: disposing or allocating may run
        // finalizers that remove other entries.
        if let Some(stale) = stale {
            heap.dispose_weak(stale.weak);
        }

        self.create_and_insert(heap, string, key)
    }

    fn create_and_insert(
        &self,
        heap: &mut H,
        string: &NativeString,
        key: StringKey,
    ) -> Result<H::Handle, HeapError> {
        let handle = match heap.new_external_string(ExternalStringResource::from(string)) {
            Ok(handle) => handle,
            Err(err) => {
                self.state.borrow_mut().stats.allocation_failures += 1;
                tracing::debug!("Failed to create external string for {:?}: {}", key, err);
                return Err(err);
            }
        };

        let owner = Rc::downgrade(&self.state);
        let weak = heap.make_weak(&handle, Box::new(move || finalize(&owner, key)));
        heap.mark_independent(&weak);

        let mut state = self.state.borrow_mut();
        let previous = state.entries.insert(
            key,
            CacheEntry {
                string: string.clone(),
                weak: weak.clone(),
            },
        );
        debug_assert!(previous.is_none(), "duplicate external string for {:?}", key);
        state.last = Some((key, weak));
        state.stats.creations += 1;

        tracing::trace!(
            "Cached external string for {:?} ({} entries)",
            key,
            state.entries.len()
        );

        Ok(handle)
    }

    /// Drop the entry for `string` without waiting for the collector.
    ///
    /// For native strings destroyed through some path other than collection:
    /// `string` must be the last handle outside the cache, and it is consumed
    /// here. Nobody can resolve the same buffer again afterwards, so a heap
    /// object that is still alive stays the only one for its identity; it
    /// remains valid but is no longer cached and its finalizer is cancelled.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, heap: &mut H, string: NativeString) -> bool {
        let key = string.key();
        let entry = {
            let mut state = self.state.borrow_mut();
            let entry = state.take_entry(key);
            if entry.is_some() {
                state.stats.removed += 1;
            }
            entry
        };

        let Some(entry) = entry else {
            return false;
        };

        // The caller's handle plus the cache's own
        debug_assert_eq!(
            entry.string.ref_count(),
            2,
            "removing cached string {:?} that is still shared",
            key
        );

        heap.dispose_weak(entry.weak);
        tracing::trace!("Removed external string for {:?}", key);
        true
    }

    /// Dispose of every entry, releasing all weak references and native
    /// references. Called by the owner of the heap when it shuts down.
    pub fn teardown(&self, heap: &mut H) {
        let entries: Vec<CacheEntry<H::Weak>> = {
            let mut state = self.state.borrow_mut();
            state.last = None;
            let entries: Vec<_> = state.entries.drain().map(|(_, entry)| entry).collect();
            state.stats.removed += entries.len() as u64;
            entries
        };

        let count = entries.len();
        for entry in entries {
            heap.dispose_weak(entry.weak);
        }

        tracing::debug!("String cache torn down ({} entries released)", count);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `string` currently has a cached external string.
    pub fn contains(&self, string: &NativeString) -> bool {
        self.state.borrow().entries.contains_key(&string.key())
    }

    pub fn stats(&self) -> CacheStats {
        self.state.borrow().stats
    }
}

/// Finalizer body: the heap has collected the external string for `key`.
fn finalize<W>(owner: &Weak<RefCell<CacheState<W>>>, key: StringKey) {
    // Cache already gone, its entries were released when it dropped
    let Some(state) = owner.upgrade() else {
        return;
    };

    let entry = {
        let mut state = state.borrow_mut();
        let entry = state.take_entry(key);
        if entry.is_some() {
            state.stats.finalized += 1;
        }
        entry
    };

    match entry {
        Some(entry) => {
            tracing::trace!(
                "Finalized external string for {:?} (native refs: {})",
                key,
                entry.string.ref_count()
            );
            // Releases the cache's native reference
            drop(entry);
        }
        None => {
            debug_assert!(false, "finalizer for uncached string {:?}", key);
        }
    }
}

impl<H: ScriptHeap> Default for StringCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ScriptHeap> std::fmt::Debug for StringCache<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("StringCache")
            .field("entries", &state.entries.len())
            .field("stats", &state.stats)
            .finish()
    }
}
