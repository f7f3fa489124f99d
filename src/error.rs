use thiserror::Error;

/// Failure to create an object on the script heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The heap refused the allocation.
    #[error("external string allocation failed")]
    AllocationFailed,

    #[error("heap object limit reached ({limit} objects)")]
    ObjectLimit { limit: usize },

    #[error("external memory limit exceeded ({requested} bytes requested, {available} available)")]
    ExternalMemoryLimit { requested: usize, available: usize },

    #[error("string of {length} code units exceeds the maximum of {max}")]
    StringTooLong { length: usize, max: usize },
}
