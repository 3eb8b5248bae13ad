use crate::runtime::{
    context::{Context, KeyList, RootKey, alloc_varlist, check_context},
    gc::{GcHandle, GcHeap, HeapObject},
    symbol::Symbol,
    typeset::{TypeBits, Typeset},
    value::{ContextKind, Value},
};

/// An ACTION! node.
///
/// The paramlist is a keylist whose root key names the action itself, so a
/// frame built from it can find its way back.
#[derive(Debug, Clone)]
pub struct Action {
    pub paramlist: GcHandle,
    /// Array holding the implementation (a body block, or native data).
    pub details: GcHandle,
}

/// Allocates an action taking `params` and returns its handle.
pub fn make_action(heap: &mut GcHeap, params: &[Symbol], details: GcHandle) -> GcHandle {
    let mut keys = Vec::with_capacity(params.len() + 1);
    keys.push(Typeset::root());
    for param in params {
        keys.push(Typeset::new(*param, heap.canon(*param), TypeBits::ALL));
    }
    let paramlist = heap.alloc(HeapObject::KeyList(KeyList::from_keys(keys)));

    let action = heap.alloc(HeapObject::Action(Action { paramlist, details }));
    heap.keylist_mut(paramlist).root = RootKey::Action(action);
    action
}

/// Makes a FRAME! for one invocation of `action`.
///
/// The frame's keylist is the action's paramlist, shared; its phase is the
/// action. Every argument starts out void.
pub fn make_frame(heap: &mut GcHeap, action: GcHandle) -> Context {
    let paramlist = heap.action(action).paramlist;
    heap.keylist_mut(paramlist).shared = true;

    let frame = alloc_varlist(heap, ContextKind::Frame, paramlist, Value::Void);
    if let Some(Value::Context(archetype)) = heap.varlist_mut(frame.varlist()).vars.first_mut() {
        archetype.phase = Some(action);
    }
    heap.varlist_mut(frame.varlist()).exit_from = Some(action);

    check_context(heap, frame);
    frame
}
