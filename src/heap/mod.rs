//! Single-threaded managed heap for external strings.
//!
//! The heap owns one reference to every object it allocates. An object is
//! reachable while anything outside the heap holds a [`StringHandle`] to it;
//! [`ManagedHeap::collect_garbage`] frees the rest, releasing their weak
//! slots and running the finalizers registered on them.
//!
//! Collections run either on request or before an allocation once the live
//! object count reaches [`HeapLimits::gc_threshold`]. The second case means
//! finalizers can fire from inside [`ScriptHeap::new_external_string`].

mod handle;

use std::rc::{Rc, Weak};

use rustc_hash::FxHashSet;

use crate::engine::{ExternalStringResource, Finalizer, ScriptHeap};
use crate::gc::{ExternalMemory, GcTraceable, tracked_guard};
use crate::{HeapError, HeapLimits};

pub use handle::{StringHandle, WeakString};
use handle::HeapString;

struct WeakSlot {
    generation: u32,
    target: Weak<HeapString>,
    finalizer: Option<Finalizer>,
}

/// Heap statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStatistics {
    /// Objects allocated and not yet collected
    pub live_objects: usize,
    /// Weak slots in use
    pub weak_handles: usize,
    /// Bytes of external string storage held by live objects
    pub external_memory: i64,
    /// Completed collections
    pub collections: u64,
}

/// Managed heap hosting external strings.
pub struct ManagedHeap {
    limits: HeapLimits,
    objects: Vec<StringHandle>,
    weak_slots: Vec<Option<WeakSlot>>,
    free_slots: Vec<u32>,
    next_generation: u32,
    next_id: u64,
    empty: StringHandle,
    external_memory: ExternalMemory,
    pending_failures: usize,
    collections: u64,
}

impl ManagedHeap {
    /// Create a new heap
    pub fn new(limits: HeapLimits) -> Self {
        let empty = StringHandle(Rc::new(HeapString {
            id: 0,
            resource: ExternalStringResource::OneByte(bytes::Bytes::new()),
            _memory: None,
        }));

        Self {
            limits,
            objects: Vec::new(),
            weak_slots: Vec::new(),
            free_slots: Vec::new(),
            next_generation: 0,
            next_id: 1,
            empty,
            external_memory: ExternalMemory::new(),
            pending_failures: 0,
            collections: 0,
        }
    }

    pub fn limits(&self) -> &HeapLimits {
        &self.limits
    }

    /// Make the next `count` string allocations fail with
    /// [`HeapError::AllocationFailed`].
    pub fn fail_next_allocations(&mut self, count: usize) {
        self.pending_failures = count;
    }

    /// Free every unreachable object and run the finalizers of weak
    /// references to them. Returns the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        let (dead, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.objects)
            .into_iter()
            .partition(StringHandle::is_unreachable);
        self.objects = live;
        self.collections += 1;

        if dead.is_empty() {
            tracing::trace!("GC #{}: nothing to collect", self.collections);
            return 0;
        }

        let dead_addrs: FxHashSet<usize> = dead.iter().map(StringHandle::addr).collect();
        let mut finalizers = Vec::new();

        for (index, slot) in self.weak_slots.iter_mut().enumerate() {
            let targets_dead = slot
                .as_ref()
                .is_some_and(|s| dead_addrs.contains(&(s.target.as_ptr() as usize)));

            if targets_dead {
                if let Some(released) = slot.take() {
                    finalizers.extend(released.finalizer);
                }
                self.free_slots.push(index as u32);
            }
        }

        let count = dead.len();
        tracing::debug!(
            "GC #{}: freeing {} objects, running {} finalizers",
            self.collections,
            count,
            finalizers.len()
        );

        for finalizer in finalizers {
            finalizer();
        }

        drop(dead);
        count
    }

    pub fn statistics(&self) -> HeapStatistics {
        HeapStatistics {
            live_objects: self.objects.len(),
            weak_handles: self.weak_slots.len() - self.free_slots.len(),
            external_memory: self.external_memory.current(),
            collections: self.collections,
        }
    }

    fn slot(&self, weak: &WeakString) -> Option<&WeakSlot> {
        self.weak_slots
            .get(weak.index as usize)?
            .as_ref()
            .filter(|slot| slot.generation == weak.generation)
    }

    fn check_external_memory(&mut self, requested: usize) -> Result<(), HeapError> {
        let available = |heap: &Self| {
            heap.limits
                .max_external_bytes
                .saturating_sub(heap.external_memory.current().max(0) as usize)
        };

        if requested <= available(self) {
            return Ok(());
        }

        tracing::debug!(
            "External memory pressure ({} bytes requested), collecting",
            requested
        );
        self.collect_garbage();

        let available = available(self);
        if requested <= available {
            Ok(())
        } else {
            Err(HeapError::ExternalMemoryLimit {
                requested,
                available,
            })
        }
    }
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new(HeapLimits::default())
    }
}

impl ScriptHeap for ManagedHeap {
    type Handle = StringHandle;
    type Weak = WeakString;

    fn empty_string(&self) -> StringHandle {
        self.empty.clone()
    }

    fn new_external_string(
        &mut self,
        resource: ExternalStringResource,
    ) -> Result<StringHandle, HeapError> {
        if resource.len() > self.limits.max_string_length {
            return Err(HeapError::StringTooLong {
                length: resource.len(),
                max: self.limits.max_string_length,
            });
        }

        if self.limits.gc_threshold > 0 && self.objects.len() >= self.limits.gc_threshold {
            self.collect_garbage();
        }

        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            tracing::trace!("Injected allocation failure");
            return Err(HeapError::AllocationFailed);
        }

        if self.objects.len() >= self.limits.max_objects {
            return Err(HeapError::ObjectLimit {
                limit: self.limits.max_objects,
            });
        }

        self.check_external_memory(resource.external_memory_size())?;

        let memory = tracked_guard(&self.external_memory, &resource);
        let handle = StringHandle(Rc::new(HeapString {
            id: self.next_id,
            resource,
            _memory: Some(memory),
        }));
        self.next_id += 1;
        self.objects.push(handle.clone());

        Ok(handle)
    }

    fn make_weak(&mut self, handle: &StringHandle, finalizer: Finalizer) -> WeakString {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let slot = WeakSlot {
            generation,
            target: Rc::downgrade(&handle.0),
            finalizer: Some(finalizer),
        };

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.weak_slots[index as usize] = Some(slot);
                index
            }
            None => {
                self.weak_slots.push(Some(slot));
                (self.weak_slots.len() - 1) as u32
            }
        };

        WeakString { index, generation }
    }

    fn to_local(&self, weak: &WeakString) -> Option<StringHandle> {
        self.slot(weak)?.target.upgrade().map(StringHandle)
    }

    fn dispose_weak(&mut self, weak: WeakString) {
        if self.slot(&weak).is_some() {
            self.weak_slots[weak.index as usize] = None;
            self.free_slots.push(weak.index);
        }
    }
}

impl std::fmt::Debug for ManagedHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedHeap")
            .field("limits", &self.limits)
            .field("statistics", &self.statistics())
            .finish()
    }
}
