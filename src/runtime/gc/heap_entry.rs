use crate::runtime::gc::heap_object::HeapObject;

/// One occupied heap slot: the node and its mark bit for the current cycle.
pub struct HeapEntry {
    pub(crate) object: HeapObject,
    pub(crate) marked: bool,
}

impl HeapEntry {
    pub(crate) fn new(object: HeapObject) -> Self {
        Self {
            object,
            marked: false,
        }
    }
}
