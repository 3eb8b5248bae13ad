use tracing::{debug, instrument};

use crate::runtime::{
    context::{
        BindTable, CollectFlags, Collector, Context, KeyList, alloc_varlist, bind_values_shallow,
        check_context, clonify_values, collect_keylist, ensure_keylist_unique, find_key_index,
        rebind_values_deep, set_meta,
    },
    error::{Result, RuntimeError},
    gc::{GcHandle, GcHeap, HeapObject},
    stats,
    symbol::Symbol,
    typeset::Typeset,
    value::{ContextKind, SeriesAt, Value, WordKind},
};

/// Builds a context whose keys are the set-words of `head`, plus a hidden
/// `self` key holding the context's own value.
///
/// With a `parent` the new context starts from the parent's keys and
/// values. Inherited series are deep-copied, and words inside them that
/// were bound to the parent are rebound to the child. The keylist is shared
/// with the parent when `head` adds no keys.
///
/// New slots are BLANK!; nothing in `head` is evaluated.
#[instrument(level = "debug", skip_all, fields(kind = ?kind, parent = parent.is_some()))]
pub fn make_selfish_context(
    heap: &mut GcHeap,
    collector: &mut Collector,
    kind: ContextKind,
    spec: Option<Context>,
    exit_from: Option<GcHandle>,
    head: &[Value],
    parent: Option<Context>,
) -> Result<Context> {
    let (keylist, self_index) =
        collect_keylist(heap, collector, head, parent, CollectFlags::ENSURE_SELF)?;
    let shared = parent.is_some_and(|parent| parent.keylist(heap) == keylist);

    let len = heap.keylist(keylist).len() - 1;
    let mut inherited = vec![Value::Blank; len];
    if let Some(parent) = parent {
        // A parent without `self` had one inserted ahead of its keys.
        let offset = usize::from(find_key_index(heap, parent, Symbol::SELF, true) == 0);
        for (i, var) in parent.vars(heap).iter().enumerate() {
            inherited[offset + i] = var.clone();
        }
        clonify_values(heap, &mut inherited);
    }

    let ctx = alloc_varlist(heap, kind, keylist, Value::Blank);
    {
        let varlist = heap.varlist_mut(ctx.varlist());
        varlist.vars[1..].clone_from_slice(&inherited);
        varlist.exit_from = exit_from;
    }

    if shared {
        heap.keylist_mut(keylist).shared = true;
    }
    if spec.is_some() {
        ensure_keylist_unique(heap, ctx);
        set_meta(heap, ctx, spec);
    }

    let archetype = ctx.value(heap);
    *ctx.var_mut(heap, self_index) = archetype;

    if let Some(parent) = parent {
        rebind_vars(heap, ctx, parent, None);
    }

    stats::record_object();
    check_context(heap, ctx);
    Ok(ctx)
}

/// Builds a context from alternating `set-word value` pairs in the array at
/// `head`, without evaluating anything.
///
/// Words in `head` that name keys of the result are bound to it.
pub fn construct_context(
    heap: &mut GcHeap,
    collector: &mut Collector,
    kind: ContextKind,
    head: SeriesAt,
    parent: Option<Context>,
) -> Result<Context> {
    let values: Vec<Value> = heap
        .array(head.series)
        .cells_at(head.index)
        .iter()
        .map(|cell| cell.value.clone())
        .collect();

    let ctx = make_selfish_context(heap, collector, kind, None, None, &values, parent)?;
    bind_values_shallow(heap, head.series, head.index, ctx);

    let mut i = head.index;
    let len = heap.array(head.series).len();
    while i < len {
        let key = heap.array(head.series).cells()[i].value.clone();
        let Value::Word(WordKind::SetWord, word) = key else {
            return Err(RuntimeError::InvalidType { got: key.kind() });
        };

        let Some(next) = heap.array(head.series).get(i + 1) else {
            let name = heap.symbols().resolve(word.symbol).to_string();
            return Err(RuntimeError::MissingValue { name });
        };
        let value = next.value.clone();
        // A set-word here would have been collected as a key.
        if value.is_set_word() {
            return Err(RuntimeError::InvalidType { got: value.kind() });
        }

        let n = match word.binding {
            Some(varlist) if varlist == ctx.varlist() => word.index as usize,
            _ => find_key_index(heap, ctx, word.symbol, true),
        };
        if ctx.key(heap, n).is_locked() {
            return Err(RuntimeError::LockedContext);
        }
        *ctx.var_mut(heap, n) = value;

        i += 2;
    }

    Ok(ctx)
}

/// Makes a child of two parents of the same kind.
///
/// Keys come from `parent1` first, then the keys of `parent2` that are not
/// already present; on a shared spelling `parent2`'s value wins. Words in
/// the copied values that were bound to either parent end up bound to the
/// child. The child has exactly one `self` key.
#[instrument(level = "debug", skip_all)]
pub fn merge_contexts(
    heap: &mut GcHeap,
    collector: &mut Collector,
    parent1: Context,
    parent2: Context,
) -> Context {
    let kind = parent1.kind(heap);
    assert_eq!(
        kind,
        parent2.kind(heap),
        "merged contexts must be of the same kind"
    );

    collector.start();
    collector.collect_context_keys(heap, parent1, false);
    collector.collect_context_keys(heap, parent2, true);
    if collector.binds.get(Symbol::SELF) == 0 {
        collector.push_key(Typeset::self_key());
    }

    let keylist = heap.alloc(HeapObject::KeyList(KeyList::from_keys(collector.buf.clone())));

    let mut vars = vec![Value::Blank; collector.buf.len() - 1];
    for (i, var) in parent1.vars(heap).iter().enumerate() {
        vars[i] = var.clone();
    }
    for (key, var) in parent2.keys(heap).iter().zip(parent2.vars(heap)) {
        let n = collector.binds.get(key.canon);
        assert!(n > 0, "merged key lost its slot");
        vars[n as usize - 1] = var.clone();
    }
    clonify_values(heap, &mut vars);

    let child = alloc_varlist(heap, kind, keylist, Value::Blank);
    heap.varlist_mut(child.varlist()).vars[1..].clone_from_slice(&vars);

    rebind_vars(heap, child, parent1, None);
    rebind_vars(heap, child, parent2, Some(&collector.binds));
    collector.end();

    let self_index = find_key_index(heap, child, Symbol::SELF, true);
    assert!(self_index != 0, "merged context has no self key");
    let archetype = child.value(heap);
    *child.var_mut(heap, self_index) = archetype;

    debug!(len = child.len(heap), "merged contexts");
    stats::record_object();
    check_context(heap, child);
    child
}

/// Rebinds, inside `ctx`'s own variables, words that point at `src`.
fn rebind_vars(heap: &mut GcHeap, ctx: Context, src: Context, binds: Option<&BindTable>) {
    let mut vars = std::mem::take(&mut heap.varlist_mut(ctx.varlist()).vars);
    rebind_values_deep(heap, &mut vars[1..], src, ctx, binds);
    heap.varlist_mut(ctx.varlist()).vars = vars;
}
