//! Contexts: the storage behind OBJECT!, MODULE!, ERROR!, PORT! and FRAME!.
//!
//! A context is a pair of parallel arrays living on the [`GcHeap`]:
//!
//! ```text
//!   varlist                         keylist
//!   +---------------------------+   +---------------------------+
//!   | [0] archetype (OBJECT!..) |-->| [0] root key              |
//!   | [1] value of key 1        |   | [1] typeset for key 1     |
//!   | [2] value of key 2        |   | [2] typeset for key 2     |
//!   +---------------------------+   +---------------------------+
//! ```
//!
//! The varlist belongs to exactly one context. Keylists are shared between
//! contexts with identical shapes and copied on write: anything that
//! changes a keylist's structure first calls [`ensure_keylist_unique`] or
//! [`expand_context`].
//!
//! Scans that discover keys by walking source arrays use a [`Collector`]
//! that the caller owns and passes in.

use bitflags::bitflags;

use crate::runtime::{
    gc::{GcHandle, GcHeap, HeapObject},
    symbol::Symbol,
    typeset::Typeset,
    value::{ContextKind, ContextValue, Value},
};

pub mod alloc;
pub mod collect;
pub mod lookup;
pub mod make;
pub mod rebind;
pub mod resolve;

pub use alloc::{
    KeySource, alloc_context, append_key, copy_shallow, ensure_keylist_unique, expand_context,
};
pub use collect::{BindTable, CollectFlags, Collector, collect_keylist, collect_words};
pub use lookup::{
    ReflectMode, bind_values_shallow, context_to_array, context_var, find_key_index, find_value,
    find_word_in_array,
};
pub use make::{construct_context, make_selfish_context, merge_contexts};
pub use rebind::{clonify_values, rebind_values_deep};
pub use resolve::{OnlyWords, resolve};


bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VarListFlags: u8 {
        /// Values live on an evaluation stack; only the archetype is here.
        const STACK = 1 << 0;
        /// The stack frame has gone away and the values can't be reached.
        const INACCESSIBLE = 1 << 1;
        /// No variable may be added or overwritten.
        const LOCKED = 1 << 2;
    }
}

/// Value half of a context.
#[derive(Debug, Clone)]
pub struct VarList {
    pub(crate) vars: Vec<Value>,
    pub(crate) keylist: GcHandle,
    /// Where a function frame unwinds to.
    pub(crate) exit_from: Option<GcHandle>,
    pub(crate) flags: VarListFlags,
}

impl VarList {
    pub fn vars(&self) -> &[Value] {
        &self.vars
    }

    pub fn keylist(&self) -> GcHandle {
        self.keylist
    }

    pub fn exit_from(&self) -> Option<GcHandle> {
        self.exit_from
    }

    pub fn flags(&self) -> VarListFlags {
        self.flags
    }
}

/// What sits in slot 0 of a keylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKey {
    /// Ordinary object-like contexts.
    Sentinel,
    /// The keylist is the paramlist of this action.
    Action(GcHandle),
}

/// Key half of a context.
#[derive(Debug, Clone)]
pub struct KeyList {
    pub(crate) keys: Vec<Typeset>,
    pub(crate) shared: bool,
    /// Help/documentation object for the context.
    pub(crate) meta: Option<GcHandle>,
    pub(crate) root: RootKey,
}

impl KeyList {
    /// An unshared keylist holding only the root key.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut keys = Vec::with_capacity(capacity + 1);
        keys.push(Typeset::root());
        Self::from_keys(keys)
    }

    /// Wraps `keys`, whose slot 0 must already be the root key.
    pub fn from_keys(keys: Vec<Typeset>) -> Self {
        Self {
            keys,
            shared: false,
            meta: None,
            root: RootKey::Sentinel,
        }
    }

    /// All keys including the root at slot 0.
    pub fn keys(&self) -> &[Typeset] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.len() <= 1
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn meta(&self) -> Option<GcHandle> {
        self.meta
    }

    pub fn root(&self) -> RootKey {
        self.root
    }

    /// Copy with room for `extra` more keys. The copy is unshared and keeps
    /// the meta object.
    pub(crate) fn copy_extra(&self, extra: usize) -> KeyList {
        let mut keys = Vec::with_capacity(self.keys.len() + extra);
        keys.extend_from_slice(&self.keys);
        KeyList {
            keys,
            shared: false,
            meta: self.meta,
            root: self.root,
        }
    }
}

/// Handle to a context, which is the handle of its varlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context(GcHandle);

impl Context {
    pub fn from_varlist(varlist: GcHandle) -> Self {
        Self(varlist)
    }

    /// The context behind an ANY-CONTEXT! value.
    pub fn of_value(value: &Value) -> Option<Self> {
        value.as_context().map(|ctx| Self(ctx.varlist))
    }

    pub fn varlist(self) -> GcHandle {
        self.0
    }

    pub fn keylist(self, heap: &GcHeap) -> GcHandle {
        heap.varlist(self.0).keylist
    }

    /// Number of keys, not counting the root.
    pub fn len(self, heap: &GcHeap) -> usize {
        heap.keylist(self.keylist(heap)).len() - 1
    }

    pub fn is_empty(self, heap: &GcHeap) -> bool {
        self.len(heap) == 0
    }

    /// Payload of the archetype in varlist slot 0.
    pub fn archetype(self, heap: &GcHeap) -> ContextValue {
        match heap.varlist(self.0).vars.first() {
            Some(Value::Context(ctx)) => *ctx,
            _ => panic!("varlist {:?} has no context archetype", self.0),
        }
    }

    pub fn kind(self, heap: &GcHeap) -> ContextKind {
        self.archetype(heap).kind
    }

    /// The ANY-CONTEXT! value for this context.
    pub fn value(self, heap: &GcHeap) -> Value {
        Value::Context(self.archetype(heap))
    }

    /// Keys 1..=len, without the root.
    pub fn keys(self, heap: &GcHeap) -> &[Typeset] {
        &heap.keylist(self.keylist(heap)).keys[1..]
    }

    /// Vars 1..=len, without the archetype.
    pub fn vars(self, heap: &GcHeap) -> &[Value] {
        &heap.varlist(self.0).vars[1..]
    }

    /// Key at 1-based slot `n`.
    pub fn key(self, heap: &GcHeap, n: usize) -> Typeset {
        assert!(n >= 1, "slot 0 holds the root key");
        heap.keylist(self.keylist(heap)).keys[n]
    }

    /// Variable at 1-based slot `n`.
    pub fn var(self, heap: &GcHeap, n: usize) -> &Value {
        assert!(n >= 1, "slot 0 holds the archetype");
        &heap.varlist(self.0).vars[n]
    }

    pub fn var_mut(self, heap: &mut GcHeap, n: usize) -> &mut Value {
        assert!(n >= 1, "slot 0 holds the archetype");
        &mut heap.varlist_mut(self.0).vars[n]
    }

    pub fn meta(self, heap: &GcHeap) -> Option<GcHandle> {
        heap.keylist(self.keylist(heap)).meta
    }

    pub fn is_locked(self, heap: &GcHeap) -> bool {
        heap.varlist(self.0).flags.contains(VarListFlags::LOCKED)
    }
}

/// Allocates the archetype-only varlist for `keylist` and fills each
/// remaining slot with `fill`.
pub(crate) fn alloc_varlist(
    heap: &mut GcHeap,
    kind: ContextKind,
    keylist: GcHandle,
    fill: Value,
) -> Context {
    let len = heap.keylist(keylist).len();
    let mut vars = Vec::with_capacity(len);
    vars.push(Value::Blank);
    vars.resize(len, fill);

    let varlist = heap.alloc(HeapObject::VarList(VarList {
        vars,
        keylist,
        exit_from: None,
        flags: VarListFlags::empty(),
    }));
    heap.varlist_mut(varlist).vars[0] = Value::Context(ContextValue {
        kind,
        varlist,
        phase: None,
        binding: None,
    });
    Context(varlist)
}

pub fn set_meta(heap: &mut GcHeap, ctx: Context, meta: Option<Context>) {
    let keylist = ctx.keylist(heap);
    heap.keylist_mut(keylist).meta = meta.map(Context::varlist);
}

/// Marks the context so that resolving into it fails.
pub fn lock_context(heap: &mut GcHeap, ctx: Context) {
    heap.varlist_mut(ctx.0).flags.insert(VarListFlags::LOCKED);
}

/// Panics unless the context is structurally sound.
///
/// Checks that the archetype points back at the varlist, that the root key
/// is the sentinel or an action marker, and that keys and vars line up
/// (a stack context holds only its archetype).
pub fn assert_context(heap: &GcHeap, ctx: Context) {
    let varlist = heap.varlist(ctx.0);
    let keylist = match heap.try_get(varlist.keylist) {
        Some(HeapObject::KeyList(keylist)) => keylist,
        Some(other) => panic!(
            "context {:?}: keylist slot holds a {} node",
            ctx.0,
            other.shape()
        ),
        None => panic!("context {:?}: keylist was freed", ctx.0),
    };

    let keys_len = keylist.keys.len();
    let vars_len = varlist.vars.len();
    assert!(keys_len >= 1, "context {:?}: keylist cannot hold root key", ctx.0);

    if varlist.flags.contains(VarListFlags::STACK) {
        assert_eq!(vars_len, 1, "context {:?}: stack context holds vars", ctx.0);
    } else {
        assert_eq!(
            keys_len, vars_len,
            "context {:?}: unequal lengths of key and var lists",
            ctx.0
        );
    }

    let root = keylist.keys[0];
    match keylist.root {
        RootKey::Sentinel => assert!(
            root.symbol == Symbol::NONE,
            "context {:?}: root key is not the sentinel",
            ctx.0
        ),
        RootKey::Action(action) => assert!(
            matches!(heap.try_get(action), Some(HeapObject::Action(_))),
            "context {:?}: root key names a non-action",
            ctx.0
        ),
    }

    match varlist.vars.first() {
        Some(Value::Context(archetype)) => assert_eq!(
            archetype.varlist, ctx.0,
            "context {:?}: archetype points at another varlist",
            ctx.0
        ),
        _ => panic!("context {:?}: first var is not an ANY-CONTEXT!", ctx.0),
    }
}

/// Runs [`assert_context`] when the heap is configured to check contexts.
pub(crate) fn check_context(heap: &GcHeap, ctx: Context) {
    if heap.config().check_contexts {
        assert_context(heap, ctx);
    }
}
