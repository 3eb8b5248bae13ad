/// Handle into the GC heap.
///
/// A `GcHandle` is a lightweight, copyable index that refers to a node
/// managed by the collector: an array, a varlist, a keylist, byte storage,
/// or one of the smaller node shapes in [`HeapObject`](super::HeapObject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcHandle(pub(crate) u32);

impl GcHandle {
    /// Returns the raw heap slot index backing this handle.
    pub fn index(self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub fn new_for_test(index: u32) -> Self {
        Self(index)
    }
}
