//! GcTraceable trait for values that hold memory outside the heap.

use std::sync::Arc;

use bytes::Bytes;

use super::{ExternalMemory, ExternalMemoryGuard};
use crate::engine::ExternalStringResource;

/// Trait for types that can report their external memory size to the heap.
///
/// # Example
///
/// ```ignore
/// use crate::gc::GcTraceable;
///
/// struct Glyphs {
///     units: Vec<u16>,
/// }
///
/// impl GcTraceable for Glyphs {
///     fn external_memory_size(&self) -> usize {
///         self.units.len() * 2
///     }
/// }
/// ```
pub trait GcTraceable {
    /// Returns the size in bytes of external memory held by this value.
    ///
    /// This should NOT include the size of `self` or heap-managed memory.
    fn external_memory_size(&self) -> usize;
}

impl GcTraceable for Bytes {
    fn external_memory_size(&self) -> usize {
        // Bytes is reference-counted, report the visible length
        self.len()
    }
}

impl GcTraceable for Arc<[u16]> {
    fn external_memory_size(&self) -> usize {
        self.len() * std::mem::size_of::<u16>()
    }
}

impl GcTraceable for ExternalStringResource {
    fn external_memory_size(&self) -> usize {
        match self {
            Self::OneByte(bytes) => bytes.external_memory_size(),
            Self::TwoByte(units) => units.external_memory_size(),
        }
    }
}

/// Helper to create an ExternalMemoryGuard from a GcTraceable value.
///
/// # Example
///
/// ```ignore
/// let resource = ExternalStringResource::from(&string);
/// let guard = tracked_guard(&memory, &resource);
/// // guard now tracks resource.len() bytes (twice that for two-byte strings)
/// ```
pub fn tracked_guard<T: GcTraceable>(memory: &ExternalMemory, value: &T) -> ExternalMemoryGuard {
    ExternalMemoryGuard::new(memory, value.external_memory_size() as i64)
}
