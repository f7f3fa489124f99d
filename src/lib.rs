//! External string cache for a garbage-collected script heap.
//!
//! Native strings are immutable, reference-counted buffers. The script heap
//! wants its own string objects. [`StringCache`] hands out one external
//! string per native buffer, backed by the same storage, and keeps the two
//! ownership models in step through weak handles and finalizers.

pub mod engine;
pub mod gc;
pub mod heap;
pub mod isolate;
pub mod limits;
pub mod native;
pub mod string_cache;

mod error;

pub use engine::{ExternalStringResource, Finalizer, ScriptHeap};
pub use error::HeapError;
pub use heap::{HeapStatistics, ManagedHeap, StringHandle, WeakString};
pub use isolate::Isolate;
pub use limits::HeapLimits;
pub use native::{NativeString, StringKey};
pub use string_cache::{CacheStats, StringCache};
