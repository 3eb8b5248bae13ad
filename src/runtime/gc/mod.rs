pub mod gc_handle;
pub mod gc_heap;
pub mod heap_entry;
pub mod heap_object;
pub mod mark_audit;

pub use gc_handle::GcHandle;
pub use gc_heap::GcHeap;
pub use heap_object::HeapObject;
pub use mark_audit::{MarkViolation, assert_cell_marked_correctly};

#[cfg(test)]
mod mark_audit_test;
