use tracing::trace;

use crate::runtime::{
    context::{
        BindTable, Collector, Context, KeySource, append_key, ensure_keylist_unique,
        expand_context,
    },
    error::{Result, RuntimeError},
    gc::GcHeap,
    symbol::Symbol,
    typeset::KeyFlags,
    value::{SeriesAt, Value, WordKind},
};

/// Which keys [`resolve`] considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlyWords {
    /// Every key of the source.
    All,
    /// Target keys from this 1-based slot onward; 0 is read as 1.
    FromIndex(usize),
    /// The words (and set-words) in the block at this position.
    Words(SeriesAt),
}

/// Bind table entries written by one resolve, so every one of them can be
/// zeroed again however the resolve ends.
struct Marks<'a> {
    binds: &'a mut BindTable,
    touched: Vec<Symbol>,
}

impl Marks<'_> {
    fn set(&mut self, canon: Symbol, bind: i32) {
        if self.binds.get(canon) == 0 {
            self.touched.push(canon);
        }
        self.binds.set(canon, bind);
    }

    fn get(&self, canon: Symbol) -> i32 {
        self.binds.get(canon)
    }

    fn clear(&mut self, canon: Symbol) {
        self.binds.clear(canon);
    }
}

impl Drop for Marks<'_> {
    fn drop(&mut self) {
        for canon in self.touched.drain(..) {
            self.binds.clear(canon);
        }
    }
}

/// Copies values of `source` into `target` for the keys picked by `only`.
///
/// A target slot is written only when its key is not locked, and only when
/// `copy_all` is set or the slot is void. A selected word missing from the
/// source voids the target slot under the same conditions. The lookback
/// flag follows the value. With `expand`, source keys the target lacks are
/// appended to it. Hidden source keys such as `self` are never copied.
///
/// Fails with [`RuntimeError::LockedContext`] when `target` is locked.
pub fn resolve(
    heap: &mut GcHeap,
    collector: &mut Collector,
    target: Context,
    source: Context,
    only: OnlyWords,
    copy_all: bool,
    expand: bool,
) -> Result<()> {
    if target.is_locked(heap) {
        return Err(RuntimeError::LockedContext);
    }
    assert!(!collector.is_active(), "resolve during a collection pass");
    collector.binds.assert_empty();

    {
        let mut marks = Marks {
            binds: &mut collector.binds,
            touched: Vec::new(),
        };
        resolve_marked(heap, &mut marks, target, source, only, copy_all, expand);
    }

    collector.binds.assert_empty();
    Ok(())
}

fn resolve_marked(
    heap: &mut GcHeap,
    marks: &mut Marks<'_>,
    target: Context,
    source: Context,
    only: OnlyWords,
    copy_all: bool,
    expand: bool,
) {
    let mut start = 1;
    match only {
        OnlyWords::All => {}
        OnlyWords::FromIndex(index) => {
            start = index.max(1);
            if start > target.len(heap) {
                return;
            }
            for key in &target.keys(heap)[start - 1..] {
                marks.set(key.canon, -1);
            }
        }
        OnlyWords::Words(at) => {
            let words: Vec<Symbol> = heap
                .array(at.series)
                .cells_at(at.index)
                .iter()
                .filter_map(|cell| match &cell.value {
                    Value::Word(WordKind::Word | WordKind::SetWord, word) => Some(word.symbol),
                    _ => None,
                })
                .collect();
            for symbol in words {
                let canon = heap.canon(symbol);
                marks.set(canon, -1);
            }
        }
    }

    let everything = matches!(only, OnlyWords::All);
    for (n, key) in source.keys(heap).iter().enumerate() {
        if key.is_hidden() {
            continue;
        }
        if everything || marks.get(key.canon) != 0 {
            marks.set(key.canon, (n + 1) as i32);
        }
    }

    if expand {
        let mapped = source
            .keys(heap)
            .iter()
            .filter(|key| marks.get(key.canon) > 0)
            .count();
        let present = target
            .keys(heap)
            .iter()
            .filter(|key| marks.get(key.canon) > 0)
            .count();
        expand_context(heap, target, mapped.saturating_sub(present));
    }

    for n in start..=target.len(heap) {
        let key = target.key(heap, n);
        let m = marks.get(key.canon);
        if m == 0 {
            continue;
        }
        marks.clear(key.canon);

        if key.is_locked() || key.is_hidden() || !(copy_all || target.var(heap, n).is_void()) {
            continue;
        }
        if m < 0 {
            *target.var_mut(heap, n) = Value::Void;
            continue;
        }

        let m = m as usize;
        let value = source.var(heap, m).clone();
        *target.var_mut(heap, n) = value;
        let lookback = source.key(heap, m).is_lookback();
        if key.is_lookback() != lookback {
            ensure_keylist_unique(heap, target);
            let keylist = target.keylist(heap);
            heap.keylist_mut(keylist).keys[n]
                .flags
                .set(KeyFlags::LOOKBACK, lookback);
        }
    }

    if expand {
        let mut appended = 0;
        for n in 1..=source.len(heap) {
            let key = source.key(heap, n);
            if marks.get(key.canon) <= 0 {
                continue;
            }
            marks.clear(key.canon);
            let value = source.var(heap, n).clone();
            *append_key(heap, target, KeySource::Symbol(key.symbol), key.is_lookback()) = value;
            appended += 1;
        }
        if appended > 0 {
            trace!(appended, "resolve appended new keys");
        }
    }
}
