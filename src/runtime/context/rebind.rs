use std::collections::{HashMap, HashSet};

use crate::runtime::{
    context::{BindTable, Context, find_key_index},
    gc::{GcHandle, GcHeap, HeapObject},
    series::copy_bytes,
    value::Value,
};

/// Calls `visit` on each of `values` and on every cell of every array
/// reachable from them through ANY-ARRAY! values. Each array is visited
/// once, so cyclic structures terminate.
pub fn walk_values_deep(
    heap: &mut GcHeap,
    values: &mut [Value],
    visit: &mut impl FnMut(&mut Value),
) {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();

    for value in values.iter_mut() {
        visit(value);
        pending.extend(value.as_array().map(|at| at.series));
    }

    while let Some(array) = pending.pop() {
        if !seen.insert(array) {
            continue;
        }
        for cell in heap.array_mut(array).cells_mut() {
            visit(&mut cell.value);
            pending.extend(cell.value.as_array().map(|at| at.series));
        }
    }
}

/// Moves words bound to `src` over to `dst`, throughout `values` and the
/// arrays they reach.
///
/// With a bind table the destination slot of each source key is read from
/// it; otherwise it is found by spelling in `dst`. Words whose spelling has
/// no slot in `dst` keep their binding.
pub fn rebind_values_deep(
    heap: &mut GcHeap,
    values: &mut [Value],
    src: Context,
    dst: Context,
    binds: Option<&BindTable>,
) {
    let slots: Vec<usize> = src
        .keys(heap)
        .iter()
        .map(|key| match binds {
            Some(binds) => binds.get(key.canon).max(0) as usize,
            None => find_key_index(heap, dst, key.symbol, true),
        })
        .collect();

    let from = src.varlist();
    let to = dst.varlist();
    walk_values_deep(heap, values, &mut |value| {
        let Some(word) = value.as_word_mut() else {
            return;
        };
        if word.binding != Some(from) || word.index < 1 {
            return;
        }
        if let Some(&slot) = slots.get(word.index as usize - 1) {
            if slot > 0 {
                word.bind(to, slot);
            }
        }
    });
}

/// Replaces every block, path, string and binary in `values` with a deep
/// copy, so the result shares no series with the originals.
///
/// Series reached more than once are copied once; cycles are preserved.
pub fn clonify_values(heap: &mut GcHeap, values: &mut [Value]) {
    let mut memo = HashMap::new();
    for value in values.iter_mut() {
        clonify_value(heap, value, &mut memo);
    }
}

fn clonify_value(heap: &mut GcHeap, value: &mut Value, memo: &mut HashMap<GcHandle, GcHandle>) {
    match value {
        Value::Array(_, at) | Value::Path(_, at) => at.series = clone_array_deep(heap, at.series, memo),
        Value::String(_, at) | Value::Binary(at) => {
            at.series = match memo.get(&at.series) {
                Some(copy) => *copy,
                None => {
                    let copy = copy_bytes(heap, at.series);
                    memo.insert(at.series, copy);
                    copy
                }
            };
        }
        _ => {}
    }
}

fn clone_array_deep(
    heap: &mut GcHeap,
    array: GcHandle,
    memo: &mut HashMap<GcHandle, GcHandle>,
) -> GcHandle {
    if let Some(copy) = memo.get(&array) {
        return *copy;
    }

    let mut copy = heap.array(array).clone();
    copy.set_flag(crate::runtime::series::ArrayFlags::READ_ONLY, false);
    let handle = heap.alloc(HeapObject::Array(copy));
    memo.insert(array, handle);

    let mut cells = std::mem::take(heap.array_mut(handle).cells_vec_mut());
    for cell in &mut cells {
        clonify_value(heap, &mut cell.value, memo);
    }
    *heap.array_mut(handle).cells_vec_mut() = cells;

    handle
}
