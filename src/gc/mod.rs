//! External memory tracking for the script heap.
//!
//! External strings keep their characters outside the managed heap. The
//! collector still needs to see that memory to size its work, so every
//! external object holds a guard that reports its bytes to the heap.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ManagedHeap                                                │
//! │  └── ExternalMemory (shared counter, one per heap)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ExternalMemoryGuard (RAII, one per heap object)            │
//! │  ├── Adds its amount on construction                        │
//! │  └── Subtracts it when the object is freed                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  GcTraceable trait                                          │
//! │  └── external_memory_size() → usize                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::gc::{ExternalMemory, tracked_guard};
//!
//! let memory = ExternalMemory::new();
//! let resource = ExternalStringResource::from(&NativeString::new("hello"));
//! let guard = tracked_guard(&memory, &resource);
//! assert_eq!(memory.current(), 5);
//! ```

mod external_memory;
mod traceable;

pub use external_memory::{ExternalMemory, ExternalMemoryGuard};
pub use traceable::{GcTraceable, tracked_guard};
