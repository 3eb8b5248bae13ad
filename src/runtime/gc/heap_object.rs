use crate::runtime::{
    action::Action,
    context::{KeyList, VarList},
    gc::GcHandle,
    series::{array::Array, bytes::Bytes},
    value::Value,
};

/// Node shapes that live on the GC-managed heap.
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// Cells of a BLOCK!, GROUP!, PATH! and friends.
    Array(Array),
    /// Value slots of a context; slot 0 is the archetype.
    VarList(VarList),
    /// Typeset keys of a context, possibly shared between varlists.
    KeyList(KeyList),
    /// Byte storage for BINARY! and UTF-8 storage for ANY-STRING!.
    Bytes(Bytes),
    /// Paramlist plus implementation details of an ACTION!.
    Action(Action),
    /// Two cells allocated together, as used by PAIR!.
    Pairing { first: Value, second: Value },
    Bitset { bits: Vec<u8>, negated: bool },
    /// Key/value pairs stored flat in an array node.
    Map { pairlist: GcHandle },
    /// Shared payload of a managed HANDLE!.
    Handle { data: usize },
}

impl HeapObject {
    /// Short name of the node shape, used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            HeapObject::Array(_) => "array",
            HeapObject::VarList(_) => "varlist",
            HeapObject::KeyList(_) => "keylist",
            HeapObject::Bytes(_) => "bytes",
            HeapObject::Action(_) => "action",
            HeapObject::Pairing { .. } => "pairing",
            HeapObject::Bitset { .. } => "bitset",
            HeapObject::Map { .. } => "map",
            HeapObject::Handle { .. } => "handle",
        }
    }
}
