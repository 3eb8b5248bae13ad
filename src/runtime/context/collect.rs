use bitflags::bitflags;
use tracing::debug;

use crate::runtime::{
    config::RuntimeConfig,
    context::{Context, KeyList, find_key_index},
    error::{Result, RuntimeError},
    gc::{GcHandle, GcHeap, HeapObject},
    series::Array,
    symbol::Symbol,
    typeset::{TypeBits, Typeset},
    value::{Value, WordKind},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CollectFlags: u8 {
        /// Collect every word form, not only set-words.
        const ANY_WORD = 1 << 0;
        /// Recurse into nested blocks and groups.
        const DEEP = 1 << 1;
        /// Fail on a word seen twice.
        const NO_DUP = 1 << 2;
        /// Make sure the result has a hidden `self` key.
        const ENSURE_SELF = 1 << 3;
    }
}

/// Scratch map from canon symbol to a small integer.
///
/// Zero means "not in the table". The table must be empty between passes;
/// `live` counts nonzero entries so that is cheap to check.
#[derive(Debug, Default)]
pub struct BindTable {
    binds: Vec<i32>,
    live: usize,
}

impl BindTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, canon: Symbol) -> i32 {
        self.binds.get(canon.index()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, canon: Symbol, bind: i32) {
        let idx = canon.index();
        if idx >= self.binds.len() {
            if bind == 0 {
                return;
            }
            self.binds.resize(idx + 1, 0);
        }
        let slot = &mut self.binds[idx];
        match (*slot != 0, bind != 0) {
            (false, true) => self.live += 1,
            (true, false) => self.live -= 1,
            _ => {}
        }
        *slot = bind;
    }

    pub fn clear(&mut self, canon: Symbol) {
        self.set(canon, 0);
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn assert_empty(&self) {
        assert!(
            self.is_empty(),
            "bind table holds {} stale entries",
            self.live
        );
    }
}

/// Caller-owned scratch state for key collection passes.
///
/// A pass is bracketed by [`Collector::start`] and [`Collector::end`];
/// between them the bind table maps each collected canon to its slot in
/// the buffer, and slot 0 of the buffer holds the root key.
#[derive(Debug)]
pub struct Collector {
    pub(crate) binds: BindTable,
    pub(crate) buf: Vec<Typeset>,
    active: bool,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(RuntimeConfig::default().collect_buffer_capacity)
    }
}

impl Collector {
    pub fn new(capacity: usize) -> Self {
        Self {
            binds: BindTable::new(),
            buf: Vec::with_capacity(capacity.max(2)),
            active: false,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.collect_buffer_capacity)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn binds(&self) -> &BindTable {
        &self.binds
    }

    /// Keys collected so far, including the root key at slot 0.
    pub fn keys(&self) -> &[Typeset] {
        &self.buf
    }

    pub fn start(&mut self) {
        assert!(!self.active, "collection pass already in progress");
        self.binds.assert_empty();
        assert!(self.buf.is_empty(), "collect buffer not drained");

        self.buf.push(Typeset::root());
        self.active = true;
    }

    /// Clears the bind entry of every collected key and empties the buffer.
    pub fn end(&mut self) {
        assert!(self.active, "no collection pass in progress");
        self.drain();
        self.binds.assert_empty();
    }

    fn drain(&mut self) {
        for key in &self.buf {
            self.binds.clear(key.canon);
        }
        self.buf.clear();
        self.active = false;
    }

    /// Appends `key` to the buffer and binds its canon to the new slot.
    pub(crate) fn push_key(&mut self, key: Typeset) -> usize {
        let index = self.buf.len();
        self.binds.set(key.canon, index as i32);
        self.buf.push(key);
        index
    }

    /// Seeds the pass with the keys of `ctx`.
    ///
    /// With `check_dups` keys already in the table are skipped; without it
    /// the caller promises there are none and the keys are copied in bulk.
    pub fn collect_context_keys(&mut self, heap: &GcHeap, ctx: Context, check_dups: bool) {
        assert!(self.active, "no collection pass in progress");
        let keys = ctx.keys(heap);

        if check_dups {
            for key in keys {
                if self.binds.get(key.canon) != 0 {
                    continue;
                }
                self.push_key(*key);
            }
        } else {
            let base = self.buf.len();
            self.buf.extend_from_slice(keys);
            for (i, key) in keys.iter().enumerate() {
                self.binds.set(key.canon, (base + i) as i32);
            }
        }
    }

    /// Scans `values` for words and collects the ones not seen yet.
    ///
    /// On a duplicate with [`CollectFlags::NO_DUP`] the pass is abandoned
    /// (table cleared, buffer emptied) before the error is returned, so the
    /// caller must not call [`Collector::end`] afterwards.
    pub fn collect_values(
        &mut self,
        heap: &GcHeap,
        values: &[Value],
        flags: CollectFlags,
    ) -> Result<()> {
        assert!(self.active, "no collection pass in progress");
        for value in values {
            match value {
                Value::Word(kind, word) if *kind != WordKind::Issue => {
                    let canon = heap.canon(word.symbol);
                    if self.binds.get(canon) == 0 {
                        if *kind == WordKind::SetWord || flags.contains(CollectFlags::ANY_WORD) {
                            self.push_key(Typeset::new(word.symbol, canon, TypeBits::ALL));
                        }
                    } else if flags.contains(CollectFlags::NO_DUP) {
                        self.drain();
                        let name = heap.symbols().resolve(word.symbol).to_string();
                        debug!(%name, "duplicate variable in collection pass");
                        return Err(RuntimeError::DuplicateVariable { name });
                    }
                }
                Value::Array(kind, at) if kind.is_eval_block() && flags.contains(CollectFlags::DEEP) => {
                    let cells: Vec<Value> = heap
                        .array(at.series)
                        .cells_at(at.index)
                        .iter()
                        .map(|cell| cell.value.clone())
                        .collect();
                    self.collect_values(heap, &cells, flags)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `prior`'s keylist if the pass found nothing new, otherwise a
    /// fresh keylist built from the buffer.
    pub fn grab_keylist(&self, heap: &mut GcHeap, prior: Option<Context>) -> GcHandle {
        assert!(!self.buf.is_empty(), "collect buffer lost its root key");
        if let Some(prior) = prior {
            if self.buf.len() == prior.len(heap) + 1 {
                return prior.keylist(heap);
            }
        }
        heap.alloc(HeapObject::KeyList(KeyList::from_keys(self.buf.clone())))
    }
}

/// Scans `head` for the keys of a new context, starting from `prior`'s keys.
///
/// Returns the keylist and, under [`CollectFlags::ENSURE_SELF`], the slot
/// of the `self` key (0 otherwise). The keylist is `prior`'s own when no
/// new keys were found.
pub fn collect_keylist(
    heap: &mut GcHeap,
    collector: &mut Collector,
    head: &[Value],
    prior: Option<Context>,
    flags: CollectFlags,
) -> Result<(GcHandle, usize)> {
    collector.start();

    let mut self_index = 0;
    if flags.contains(CollectFlags::ENSURE_SELF) {
        self_index = prior
            .map(|prior| find_key_index(heap, prior, Symbol::SELF, true))
            .unwrap_or(0);
        if self_index == 0 {
            self_index = collector.push_key(Typeset::self_key());
        }
    }

    if let Some(prior) = prior {
        collector.collect_context_keys(heap, prior, false);
    }

    collector.collect_values(heap, head, flags)?;

    let keylist = collector.grab_keylist(heap, prior);
    collector.end();

    Ok((keylist, self_index))
}

/// Returns a new block of unbound words found in `head`.
///
/// Words of `prior` (any word form) are never reported. Only set-words are
/// gathered unless [`CollectFlags::ANY_WORD`] is given.
pub fn collect_words(
    heap: &mut GcHeap,
    collector: &mut Collector,
    head: &[Value],
    prior: Option<&[Value]>,
    flags: CollectFlags,
) -> GcHandle {
    collector.binds.assert_empty();
    assert!(!collector.active, "collection pass already in progress");

    let mut seen = Vec::new();
    if let Some(prior) = prior {
        collect_word_symbols(heap, &mut collector.binds, prior, CollectFlags::ANY_WORD, &mut seen);
    }
    let start = seen.len();
    collect_word_symbols(heap, &mut collector.binds, head, flags, &mut seen);

    for symbol in &seen {
        collector.binds.clear(heap.canon(*symbol));
    }
    collector.binds.assert_empty();

    let words = Array::from_values(seen[start..].iter().map(|symbol| Value::word(*symbol)));
    heap.alloc(HeapObject::Array(words))
}

fn collect_word_symbols(
    heap: &GcHeap,
    binds: &mut BindTable,
    values: &[Value],
    flags: CollectFlags,
    out: &mut Vec<Symbol>,
) {
    for value in values {
        match value {
            Value::Word(kind, word) if *kind != WordKind::Issue => {
                let canon = heap.canon(word.symbol);
                if binds.get(canon) == 0
                    && (*kind == WordKind::SetWord || flags.contains(CollectFlags::ANY_WORD))
                {
                    binds.set(canon, 1);
                    out.push(word.symbol);
                }
            }
            Value::Array(kind, at) if kind.is_eval_block() && flags.contains(CollectFlags::DEEP) => {
                let cells: Vec<Value> = heap
                    .array(at.series)
                    .cells_at(at.index)
                    .iter()
                    .map(|cell| cell.value.clone())
                    .collect();
                collect_word_symbols(heap, binds, &cells, flags, out);
            }
            _ => {}
        }
    }
}
