//! Capabilities the string cache needs from a script engine.

use std::sync::Arc;

use bytes::Bytes;

use crate::HeapError;
use crate::native::{NativeString, StringData};

/// Callback run by the heap once a weakly held object has become unreachable.
///
/// The closure carries whatever context it needs; the heap passes nothing in.
pub type Finalizer = Box<dyn FnOnce()>;

/// Character storage lent to the script heap by a native string.
///
/// Cloning shares the storage, it never copies characters.
#[derive(Clone)]
pub enum ExternalStringResource {
    OneByte(Bytes),
    TwoByte(Arc<[u16]>),
}

impl ExternalStringResource {
    /// Length in code units.
    pub fn len(&self) -> usize {
        match self {
            Self::OneByte(bytes) => bytes.len(),
            Self::TwoByte(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_one_byte(&self) -> bool {
        matches!(self, Self::OneByte(_))
    }

    /// Pointer to the first code unit, for checking that storage is shared.
    pub fn data_ptr(&self) -> *const u8 {
        match self {
            Self::OneByte(bytes) => bytes.as_ptr(),
            Self::TwoByte(units) => units.as_ptr() as *const u8,
        }
    }

    pub fn to_string_lossy(&self) -> String {
        match self {
            Self::OneByte(bytes) => bytes.iter().map(|&b| b as char).collect(),
            Self::TwoByte(units) => String::from_utf16_lossy(units),
        }
    }
}

impl From<&NativeString> for ExternalStringResource {
    fn from(string: &NativeString) -> Self {
        match string.data() {
            StringData::Latin1(bytes) => Self::OneByte(bytes.clone()),
            StringData::Utf16(units) => Self::TwoByte(Arc::clone(units)),
        }
    }
}

impl std::fmt::Debug for ExternalStringResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalStringResource")
            .field("one_byte", &self.is_one_byte())
            .field("len", &self.len())
            .finish()
    }
}

/// A garbage-collected heap able to host external strings.
///
/// All methods are called on the thread that owns the heap. Only the
/// `&mut self` methods may run a collection, and with it finalizers.
pub trait ScriptHeap {
    /// Local handle to a string object. Equality is object identity.
    type Handle: Clone + PartialEq;

    /// Weak reference token. Clones name the same weak slot.
    type Weak: Clone + 'static;

    /// The canonical empty string.
    fn empty_string(&self) -> Self::Handle;

    /// Create a string object backed by `resource` without copying it.
    ///
    /// May collect garbage before allocating.
    fn new_external_string(
        &mut self,
        resource: ExternalStringResource,
    ) -> Result<Self::Handle, HeapError>;

    /// Register a weak reference to `handle`, running `finalizer` when the
    /// object is collected. The heap releases the weak slot itself before
    /// calling the finalizer.
    fn make_weak(&mut self, handle: &Self::Handle, finalizer: Finalizer) -> Self::Weak;

    /// Hint that the object does not need to survive scavenges with its
    /// referrers.
    fn mark_independent(&mut self, _weak: &Self::Weak) {}

    /// Upgrade a weak reference, or `None` if its object was collected.
    fn to_local(&self, weak: &Self::Weak) -> Option<Self::Handle>;

    /// Release a weak slot without running its finalizer.
    fn dispose_weak(&mut self, weak: Self::Weak);
}
