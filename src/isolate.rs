//! Script heap bundled with its string cache.
//!
//! One cache per heap: the isolate owns both, passes the heap explicitly to
//! every cache call, and tears the cache down before the heap goes away.

use crate::engine::ScriptHeap;
use crate::{HeapError, HeapLimits, ManagedHeap, NativeString, StringCache, StringHandle};

/// A managed heap and the external string cache that feeds it.
pub struct Isolate {
    heap: ManagedHeap,
    strings: StringCache<ManagedHeap>,
}

impl Isolate {
    /// Create a new isolate
    pub fn new(limits: HeapLimits) -> Self {
        tracing::debug!(
            "Creating isolate (gc_threshold={}, max_external={}MB)",
            limits.gc_threshold,
            limits.max_external_bytes / (1024 * 1024)
        );

        Self {
            heap: ManagedHeap::new(limits),
            strings: StringCache::new(),
        }
    }

    /// Heap string for `string`, shared with earlier calls while it lives.
    pub fn external_string(&mut self, string: &NativeString) -> Result<StringHandle, HeapError> {
        self.strings.resolve(&mut self.heap, string)
    }

    /// Forget the cached heap string for a native string that is being
    /// destroyed. `string` must be the last handle outside the cache.
    /// Returns whether one was cached.
    pub fn forget_string(&mut self, string: NativeString) -> bool {
        self.strings.remove(&mut self.heap, string)
    }

    pub fn empty_string(&self) -> StringHandle {
        self.heap.empty_string()
    }

    /// Run a full collection, returning the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect_garbage()
    }

    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ManagedHeap {
        &mut self.heap
    }

    pub fn string_cache(&self) -> &StringCache<ManagedHeap> {
        &self.strings
    }
}

impl Default for Isolate {
    fn default() -> Self {
        Self::new(HeapLimits::default())
    }
}

impl Drop for Isolate {
    fn drop(&mut self) {
        self.strings.teardown(&mut self.heap);
    }
}

impl std::fmt::Debug for Isolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolate")
            .field("heap", &self.heap)
            .field("strings", &self.strings)
            .finish()
    }
}
