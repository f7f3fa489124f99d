//! Handles to heap objects.

use std::rc::Rc;

use crate::engine::ExternalStringResource;
use crate::gc::ExternalMemoryGuard;

/// A string object living on the managed heap.
pub(crate) struct HeapString {
    pub(crate) id: u64,
    pub(crate) resource: ExternalStringResource,
    pub(crate) _memory: Option<ExternalMemoryGuard>,
}

/// Strong local handle to a heap string.
///
/// While any handle exists outside the heap the object is reachable and
/// will survive collections.
#[derive(Clone)]
pub struct StringHandle(pub(crate) Rc<HeapString>);

impl StringHandle {
    /// Heap-assigned object id, unique for the lifetime of the heap.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Length in code units.
    pub fn len(&self) -> usize {
        self.0.resource.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.resource.is_empty()
    }

    pub fn is_one_byte(&self) -> bool {
        self.0.resource.is_one_byte()
    }

    /// Storage backing this object.
    pub fn resource(&self) -> &ExternalStringResource {
        &self.0.resource
    }

    pub fn to_rust_string(&self) -> String {
        self.0.resource.to_string_lossy()
    }

    /// Whether both handles name the same heap object.
    pub fn ptr_eq(&self, other: &StringHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Only the heap's own reference is left.
    #[inline]
    pub(crate) fn is_unreachable(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }
}

impl PartialEq for StringHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for StringHandle {}

impl std::fmt::Debug for StringHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringHandle")
            .field("id", &self.id())
            .field("value", &self.to_rust_string())
            .finish()
    }
}

/// Weak reference token into the heap's weak slot table.
///
/// Tokens are plain indices; a token whose slot has been released or reused
/// no longer upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeakString {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}
