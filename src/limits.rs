/// Script heap resource limits configuration
#[derive(Debug, Clone)]
pub struct HeapLimits {
    /// Live object count that triggers a collection before the next
    /// allocation (default: 10_000, 0 = never)
    pub gc_threshold: usize,
    /// Maximum number of live objects (default: 1_000_000)
    pub max_objects: usize,
    /// Maximum bytes of external string storage (default: 128MB)
    pub max_external_bytes: usize,
    /// Maximum string length in code units (default: V8's 64-bit limit)
    pub max_string_length: usize,
}

impl Default for HeapLimits {
    fn default() -> Self {
        Self {
            gc_threshold: 10_000,
            max_objects: 1_000_000,
            max_external_bytes: 128 * 1024 * 1024,
            max_string_length: (1 << 29) - 24,
        }
    }
}

impl HeapLimits {
    /// Limits with allocation-triggered collection after `threshold` objects.
    pub fn with_gc_threshold(threshold: usize) -> Self {
        Self {
            gc_threshold: threshold,
            ..Self::default()
        }
    }
}
