use tracing::trace;

use crate::runtime::{
    context::{Context, KeyList, VarList, VarListFlags, alloc_varlist},
    gc::{GcHeap, HeapObject},
    stats,
    symbol::Symbol,
    typeset::{KeyFlags, TypeBits, Typeset},
    value::{ContextKind, Value, Word},
};

/// Creates a context with room for `len` keys and no keys yet.
///
/// The archetype is initialized with `kind` and no phase, so a FRAME! made
/// this way still needs its phase set before it passes the mark audit.
pub fn alloc_context(heap: &mut GcHeap, kind: ContextKind, len: usize) -> Context {
    let keylist = heap.alloc(HeapObject::KeyList(KeyList::with_capacity(len)));
    let ctx = alloc_varlist(heap, kind, keylist, Value::Void);
    heap.varlist_mut(ctx.varlist()).vars.reserve(len);
    ctx
}

/// Breaks `ctx` away from a shared keylist, reserving `delta` more keys.
///
/// Returns whether the keylist was copied.
fn expand_keylist(heap: &mut GcHeap, ctx: Context, delta: usize) -> bool {
    let keylist = ctx.keylist(heap);
    if heap.keylist(keylist).shared {
        let copy = heap.keylist(keylist).copy_extra(delta);
        let copy = heap.alloc(HeapObject::KeyList(copy));
        heap.varlist_mut(ctx.varlist()).keylist = copy;

        stats::record_keylist_copy();
        trace!(?keylist, ?copy, "copied shared keylist on write");
        return true;
    }

    heap.keylist_mut(keylist).keys.reserve(delta);
    false
}

/// Makes sure no other context observes changes to `ctx`'s keylist.
///
/// Returns `true` if the keylist had to be copied.
pub fn ensure_keylist_unique(heap: &mut GcHeap, ctx: Context) -> bool {
    expand_keylist(heap, ctx, 0)
}

/// Reserves room for `delta` more keys and vars.
///
/// The varlist grows in place. The keylist grows in place when unique and
/// is copied first when shared, so other holders are never affected.
pub fn expand_context(heap: &mut GcHeap, ctx: Context, delta: usize) {
    if delta == 0 {
        return;
    }
    heap.varlist_mut(ctx.varlist()).vars.reserve(delta);
    expand_keylist(heap, ctx, delta);
}

/// Where the name of an appended key comes from.
pub enum KeySource<'a> {
    /// Use the word's symbol, then bind the word to the new slot.
    Word(&'a mut Word),
    Symbol(Symbol),
}

/// Adds one key and one void variable to the end of `ctx`.
///
/// Returns the new variable so the caller can fill it in.
pub fn append_key<'h>(
    heap: &'h mut GcHeap,
    ctx: Context,
    source: KeySource<'_>,
    lookback: bool,
) -> &'h mut Value {
    ensure_keylist_unique(heap, ctx);

    let symbol = match &source {
        KeySource::Word(word) => word.symbol,
        KeySource::Symbol(symbol) => *symbol,
    };
    assert!(symbol != Symbol::NONE, "appended keys need a real symbol");

    let mut key = Typeset::new(symbol, heap.canon(symbol), TypeBits::ALL);
    if lookback {
        key.flags.insert(KeyFlags::LOOKBACK);
    }

    let keylist = ctx.keylist(heap);
    heap.keylist_mut(keylist).keys.push(key);

    let varlist = heap.varlist_mut(ctx.varlist());
    varlist.vars.push(Value::Void);
    let index = varlist.vars.len() - 1;

    if let KeySource::Word(word) = source {
        word.bind(ctx.varlist(), index);
    }

    &mut heap.varlist_mut(ctx.varlist()).vars[index]
}

/// Copies `source`'s varlist into a new context.
///
/// With `extra == 0` the two contexts share one keylist, which is marked
/// shared. Otherwise the new context gets its own keylist with room for
/// `extra` more keys. Nested series are not copied.
pub fn copy_shallow(heap: &mut GcHeap, source: Context, extra: usize) -> Context {
    let src_keylist = source.keylist(heap);
    let src = heap.varlist(source.varlist());

    let mut vars = Vec::with_capacity(src.vars.len() + extra);
    vars.extend_from_slice(&src.vars);
    let exit_from = src.exit_from;

    let keylist = if extra == 0 {
        heap.keylist_mut(src_keylist).shared = true;
        src_keylist
    } else {
        let copy = heap.keylist(src_keylist).copy_extra(extra);
        heap.alloc(HeapObject::KeyList(copy))
    };

    let varlist = heap.alloc(HeapObject::VarList(VarList {
        vars,
        keylist,
        exit_from,
        flags: VarListFlags::empty(),
    }));
    if let Value::Context(archetype) = &mut heap.varlist_mut(varlist).vars[0] {
        archetype.varlist = varlist;
    }

    Context::from_varlist(varlist)
}
