//! Series nodes and the primitives the context and splice code build on.
pub mod array;
pub mod bytes;

use crate::runtime::{
    gc::{GcHandle, GcHeap, HeapObject},
    value::{SeriesAt, Value},
};

pub use array::{Array, ArrayFlags};
pub use bytes::{Bookmark, Bytes, TextInfo};

pub fn make_array(heap: &mut GcHeap, array: Array) -> GcHandle {
    heap.alloc(HeapObject::Array(array))
}

/// Allocates a block holding `values` and returns the BLOCK! value.
pub fn make_block(heap: &mut GcHeap, values: impl IntoIterator<Item = Value>) -> Value {
    Value::block(make_array(heap, Array::from_values(values)))
}

pub fn make_text(heap: &mut GcHeap, s: &str) -> Value {
    Value::text(heap.alloc(HeapObject::Bytes(Bytes::text(s))))
}

pub fn make_binary(heap: &mut GcHeap, data: &[u8]) -> Value {
    let series = heap.alloc(HeapObject::Bytes(Bytes::binary(data.to_vec())));
    Value::Binary(SeriesAt::head(series))
}

/// Shallow copy of the array at `at`, from its index to the tail, with
/// room for `extra` more cells.
pub fn copy_array_shallow(heap: &mut GcHeap, at: SeriesAt, extra: usize) -> GcHandle {
    let copy = heap.array(at.series).copy_at_extra(at.index, extra);
    make_array(heap, copy)
}

/// Copy of the byte storage behind `series`, as a fresh unshared node.
pub fn copy_bytes(heap: &mut GcHeap, series: GcHandle) -> GcHandle {
    let mut copy = heap.bytes(series).clone();
    copy.set_bookmark(None);
    copy.set_read_only(false);
    heap.alloc(HeapObject::Bytes(copy))
}

/// Number of cells from `at.index` to the tail.
pub fn array_len_at(heap: &GcHeap, at: SeriesAt) -> usize {
    heap.array(at.series).len().saturating_sub(at.index)
}
