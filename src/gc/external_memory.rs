//! External memory tracking for the script heap.

use std::cell::Cell;
use std::rc::Rc;

/// Running total of external bytes owned by heap objects.
///
/// Cloning shares the counter. A heap and all of its guards use one counter.
#[derive(Clone, Default)]
pub struct ExternalMemory {
    total: Rc<Cell<i64>>,
}

impl ExternalMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current external byte total.
    pub fn current(&self) -> i64 {
        self.total.get()
    }

    fn adjust(&self, delta: i64) {
        if delta != 0 {
            self.total.set(self.total.get() + delta);
            log::trace!("Adjusted external memory: {} bytes", delta);
        }
    }
}

impl std::fmt::Debug for ExternalMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalMemory")
            .field("current", &self.current())
            .finish()
    }
}

/// RAII guard that tracks external memory with the heap.
///
/// When created, adds the amount to the heap's counter.
/// When dropped, subtracts it again.
///
/// # Example
///
/// ```ignore
/// struct HeapString {
///     resource: ExternalStringResource,
///     _memory: ExternalMemoryGuard,
/// }
/// ```
pub struct ExternalMemoryGuard {
    memory: ExternalMemory,
    amount: i64,
}

impl ExternalMemoryGuard {
    /// Create a new guard tracking `amount` bytes against `memory`.
    pub fn new(memory: &ExternalMemory, amount: i64) -> Self {
        memory.adjust(amount);

        Self {
            memory: memory.clone(),
            amount,
        }
    }

    /// Get the currently tracked amount.
    pub fn amount(&self) -> i64 {
        self.amount
    }
}

impl Drop for ExternalMemoryGuard {
    fn drop(&mut self) {
        self.memory.adjust(-self.amount);
    }
}

impl std::fmt::Debug for ExternalMemoryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalMemoryGuard")
            .field("amount", &self.amount())
            .finish()
    }
}
