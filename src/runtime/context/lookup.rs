use crate::runtime::{
    context::Context,
    gc::{GcHandle, GcHeap},
    series::{Array, make_array},
    symbol::Symbol,
    value::{Cell, Value, Word, WordKind},
};

/// Which half of a context [`context_to_array`] reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectMode {
    Words,
    Values,
    /// `key: value` pairs, each set-word starting a new line.
    WordsAndValues,
}

/// 1-based slot of the key spelled `symbol` (compared by symbol or canon),
/// or 0 when absent. Hidden keys count as absent unless `include_hidden`.
///
/// Contexts are small, so this is a plain linear scan.
pub fn find_key_index(heap: &GcHeap, ctx: Context, symbol: Symbol, include_hidden: bool) -> usize {
    let canon = heap.canon(symbol);
    for (i, key) in ctx.keys(heap).iter().enumerate() {
        if key.symbol == symbol || key.canon == canon {
            return if !include_hidden && key.is_hidden() { 0 } else { i + 1 };
        }
    }
    0
}

pub fn find_value(heap: &GcHeap, ctx: Context, symbol: Symbol) -> Option<&Value> {
    match find_key_index(heap, ctx, symbol, false) {
        0 => None,
        n => Some(ctx.var(heap, n)),
    }
}

/// Position of the first word of any kind, at or after `index`, whose canon
/// matches `symbol`'s.
pub fn find_word_in_array(
    heap: &GcHeap,
    array: GcHandle,
    index: usize,
    symbol: Symbol,
) -> Option<usize> {
    let canon = heap.canon(symbol);
    heap.array(array)
        .cells()
        .iter()
        .enumerate()
        .skip(index)
        .find(|(_, cell)| {
            cell.value
                .as_word()
                .is_some_and(|word| heap.canon(word.symbol) == canon)
        })
        .map(|(i, _)| i)
}

/// Variable at 1-based `index`, or `None` when out of range.
pub fn context_var(heap: &GcHeap, ctx: Context, index: usize) -> Option<&Value> {
    if index == 0 || index > ctx.len(heap) {
        return None;
    }
    Some(ctx.var(heap, index))
}

/// Reflects the visible keys and/or values of `ctx` into a new block.
///
/// Words are bound to `ctx`. Hidden keys such as `self` are skipped.
pub fn context_to_array(heap: &mut GcHeap, ctx: Context, mode: ReflectMode) -> GcHandle {
    let len = ctx.len(heap);
    let capacity = if mode == ReflectMode::WordsAndValues {
        len * 2
    } else {
        len
    };
    let mut block = Array::with_capacity(capacity);

    for (i, (key, var)) in ctx.keys(heap).iter().zip(ctx.vars(heap)).enumerate() {
        if key.is_hidden() {
            continue;
        }
        let word = Word::bound(key.symbol, ctx.varlist(), i + 1);
        match mode {
            ReflectMode::Words => block.push(Value::Word(WordKind::Word, word)),
            ReflectMode::Values => block.push(var.clone()),
            ReflectMode::WordsAndValues => {
                block.push_cell(Cell::with_newline(Value::Word(WordKind::SetWord, word)));
                block.push(var.clone());
            }
        }
    }

    make_array(heap, block)
}

/// Binds every word in `array` from `index` on whose spelling is a key of
/// `ctx`. Nested blocks are left alone.
pub fn bind_values_shallow(heap: &mut GcHeap, array: GcHandle, index: usize, ctx: Context) {
    let lookup: &GcHeap = heap;
    let targets: Vec<(usize, usize)> = lookup
        .array(array)
        .cells()
        .iter()
        .enumerate()
        .skip(index)
        .filter_map(|(i, cell)| {
            let word = cell.value.as_word()?;
            match find_key_index(lookup, ctx, word.symbol, true) {
                0 => None,
                n => Some((i, n)),
            }
        })
        .collect();

    let cells = heap.array_mut(array).cells_mut();
    for (i, n) in targets {
        if let Some(word) = cells[i].value.as_word_mut() {
            word.bind(ctx.varlist(), n);
        }
    }
}
