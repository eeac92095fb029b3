//! Tunables of a `Runtime`.

/// First object identity handed out by a fresh heap. Keeps live identities visibly distinct from
/// small integers when debugging.
pub const DEFAULT_HEAP_ID_BASE: u32 = 1000;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct VmOptions {
    /// Identity of the first object allocated.
    pub heap_id_base: u32,
    /// Maximum number of frames on one thread's call stack.
    pub max_call_depth: usize,
    /// When set, the runtime collects garbage between instructions once the number of live
    /// objects exceeds this many.
    pub gc_threshold: Option<usize>,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            heap_id_base: DEFAULT_HEAP_ID_BASE,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            gc_threshold: None,
        }
    }
}

impl VmOptions {
    pub fn with_heap_id_base(mut self, heap_id_base: u32) -> Self {
        self.heap_id_base = heap_id_base;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_gc_threshold(mut self, gc_threshold: usize) -> Self {
        self.gc_threshold = Some(gc_threshold);
        self
    }
}
