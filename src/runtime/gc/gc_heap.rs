use tracing::debug;

use crate::runtime::{
    action::Action,
    config::{MIN_GC_THRESHOLD, RuntimeConfig},
    context::{KeyList, RootKey, VarList},
    gc::{
        gc_handle::GcHandle,
        heap_entry::HeapEntry,
        heap_object::HeapObject,
        mark_audit::{self, MarkViolation},
    },
    series::{array::Array, bytes::Bytes},
    stats,
    symbol::{Interner, Symbol},
    value::Value,
};

enum WorkItem {
    Value(Value),
    Handle(GcHandle),
}

/// Stop-the-world mark-and-sweep heap for series and context nodes.
///
/// Besides the node arena the heap owns the symbol table and the runtime
/// configuration, since every context operation needs all three.
pub struct GcHeap {
    entries: Vec<Option<HeapEntry>>,
    free_list: Vec<u32>,
    allocation_count: usize,
    gc_threshold: usize,
    gc_enabled: bool,
    total_collections: usize,
    total_allocations: usize,
    symbols: Interner,
    config: RuntimeConfig,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! node_accessors {
    ($($name:ident, $name_mut:ident => $variant:ident($ty:ty);)*) => {
        $(
            #[doc = concat!("Returns the ", stringify!($name), " node behind `handle`.")]
            ///
            /// Panics if the handle is free or holds another node shape.
            pub fn $name(&self, handle: GcHandle) -> &$ty {
                match self.get(handle) {
                    HeapObject::$variant(node) => node,
                    other => panic!(
                        "expected {} node at {:?}, found {}",
                        stringify!($name),
                        handle,
                        other.shape()
                    ),
                }
            }

            pub fn $name_mut(&mut self, handle: GcHandle) -> &mut $ty {
                match self.get_mut(handle) {
                    HeapObject::$variant(node) => node,
                    other => panic!(
                        "expected {} node at {:?}, found {}",
                        stringify!($name),
                        handle,
                        other.shape()
                    ),
                }
            }
        )*
    };
}

impl GcHeap {
    /// Creates a heap with the default [`RuntimeConfig`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            allocation_count: 0,
            gc_threshold: config.gc_threshold,
            gc_enabled: true,
            total_collections: 0,
            total_allocations: 0,
            symbols: Interner::new(),
            config,
        }
    }

    /// Creates a new heap with a custom GC allocation threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp to `MIN_GC_THRESHOLD`.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut heap = Self::new();
        heap.gc_threshold = threshold;
        heap
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn symbols(&self) -> &Interner {
        &self.symbols
    }

    pub fn intern(&mut self, spelling: &str) -> Symbol {
        self.symbols.intern(spelling)
    }

    pub fn canon(&self, symbol: Symbol) -> Symbol {
        self.symbols.canon(symbol)
    }

    /// Enables or disables automatic collection checks.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled
    }

    /// Sets the allocation threshold that triggers collection.
    ///
    /// Values below `MIN_GC_THRESHOLD` are clamped upward.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.max(MIN_GC_THRESHOLD)
    }

    /// Returns `true` when GC is enabled and the threshold was reached.
    pub fn should_collect(&self) -> bool {
        self.gc_enabled && self.allocation_count >= self.gc_threshold
    }

    /// Allocates a new heap node and returns a stable handle to it.
    ///
    /// Freed slots are reused through the internal free-list before growing
    /// the storage vector.
    pub fn alloc(&mut self, object: HeapObject) -> GcHandle {
        self.allocation_count += 1;
        self.total_allocations += 1;

        let entry = HeapEntry::new(object);

        if let Some(idx) = self.free_list.pop() {
            self.entries[idx as usize] = Some(entry);
            GcHandle(idx)
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(Some(entry));
            GcHandle(idx)
        }
    }

    /// Returns an immutable reference to a live node by handle.
    ///
    /// Panics if the handle points to a free slot or is out of bounds.
    pub fn get(&self, handle: GcHandle) -> &HeapObject {
        match self.entries.get(handle.0 as usize) {
            Some(Some(entry)) => &entry.object,
            _ => panic!("GcHeap::get: invalid or free handle {handle:?}"),
        }
    }

    pub fn get_mut(&mut self, handle: GcHandle) -> &mut HeapObject {
        match self.entries.get_mut(handle.0 as usize) {
            Some(Some(entry)) => &mut entry.object,
            _ => panic!("GcHeap::get_mut: invalid or free handle {handle:?}"),
        }
    }

    /// Returns the node if the slot is live, without panicking.
    pub fn try_get(&self, handle: GcHandle) -> Option<&HeapObject> {
        self.entries
            .get(handle.0 as usize)
            .and_then(|entry| entry.as_ref())
            .map(|entry| &entry.object)
    }

    node_accessors! {
        array, array_mut => Array(Array);
        varlist, varlist_mut => VarList(VarList);
        keylist, keylist_mut => KeyList(KeyList);
        bytes, bytes_mut => Bytes(Bytes);
        action, action_mut => Action(Action);
    }

    /// Whether `handle` refers to a live node that carries the mark bit.
    pub fn is_marked(&self, handle: GcHandle) -> bool {
        matches!(
            self.entries.get(handle.0 as usize),
            Some(Some(entry)) if entry.marked
        )
    }

    /// Returns the number of currently live heap entries.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Returns the total number of allocations performed by this heap.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    /// Returns the total number of completed GC cycles.
    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Runs a full stop-the-world collection.
    ///
    /// Marks everything reachable from `roots`, audits the marks when
    /// `audit_marks` is configured, then frees every unmarked node. Returns
    /// how many nodes were freed.
    ///
    /// Panics if the audit finds a cell whose referents were not marked;
    /// that is a collector bug, not a recoverable condition.
    pub fn collect(&mut self, roots: &[Value]) -> usize {
        self.mark(roots);

        if self.config.audit_marks {
            match self.audit(roots) {
                Ok(cells) => {
                    stats::record_audited_cycle();
                    debug!(cells, "mark audit passed");
                }
                Err(violation) => panic!("GC mark audit failed: {violation}"),
            }
        }

        let live_before = self.live_count();
        self.sweep();
        let live_after = self.live_count();
        let collected = live_before.saturating_sub(live_after);

        self.total_collections += 1;
        self.allocation_count = 0;

        self.adapt_threshold(collected, live_before);

        debug!(
            live_before,
            live_after,
            collected,
            threshold = self.gc_threshold,
            "gc cycle complete"
        );

        collected
    }

    /// Sets the mark bit on every node reachable from `roots`.
    ///
    /// [`Self::collect`] calls this itself; it is public so the audit can
    /// be exercised between the mark and sweep phases.
    pub fn mark(&mut self, roots: &[Value]) {
        let mut worklist = Vec::with_capacity(16);
        for root in roots {
            worklist.push(WorkItem::Value(root.clone()));
        }

        while let Some(item) = worklist.pop() {
            match item {
                WorkItem::Handle(handle) => self.mark_handle(handle, &mut worklist),
                WorkItem::Value(value) => Self::queue_value(value, &mut worklist),
            }
        }
    }

    /// Checks every root and every cell held by a marked node.
    ///
    /// Returns the number of cells checked.
    pub fn audit(&self, roots: &[Value]) -> Result<usize, MarkViolation> {
        let mut checked = 0;
        for root in roots {
            mark_audit::assert_cell_marked_correctly(self, root)?;
            checked += 1;
        }

        for entry in self.entries.iter().flatten() {
            if !entry.marked {
                continue;
            }
            checked += mark_audit::audit_node(self, &entry.object)?;
        }

        Ok(checked)
    }

    fn queue_value(value: Value, worklist: &mut Vec<WorkItem>) {
        match value {
            Value::Pair(handle)
            | Value::Bitset(handle)
            | Value::Map(handle)
            | Value::Action(handle) => worklist.push(WorkItem::Handle(handle)),
            Value::Handle(singular) => {
                if let Some(handle) = singular {
                    worklist.push(WorkItem::Handle(handle));
                }
            }
            Value::Datatype { spec, .. } => {
                if let Some(handle) = spec {
                    worklist.push(WorkItem::Handle(handle));
                }
            }
            Value::Binary(at)
            | Value::String(_, at)
            | Value::Array(_, at)
            | Value::Path(_, at) => worklist.push(WorkItem::Handle(at.series)),
            Value::Context(ctx) => {
                worklist.push(WorkItem::Handle(ctx.varlist));
                worklist.extend(ctx.phase.map(WorkItem::Handle));
                worklist.extend(ctx.binding.map(WorkItem::Handle));
            }
            Value::Varargs { binding, phase } => {
                worklist.push(WorkItem::Handle(binding));
                worklist.extend(phase.map(WorkItem::Handle));
            }
            Value::Word(_, word) => {
                worklist.extend(word.binding.map(WorkItem::Handle));
            }
            Value::Quoted { cell, .. } => worklist.push(WorkItem::Value(*cell)),
            // Leaf types: no GC references
            Value::Nulled
            | Value::Void
            | Value::Blank
            | Value::Logic(_)
            | Value::Integer(_)
            | Value::Decimal(_)
            | Value::Percent(_)
            | Value::Char(_)
            | Value::Tuple(_)
            | Value::Time(_)
            | Value::Date(_)
            | Value::Typeset(_)
            | Value::Param(..) => {}
        }
    }

    fn mark_handle(&mut self, handle: GcHandle, worklist: &mut Vec<WorkItem>) {
        let idx = handle.index() as usize;

        // Mark first so cycles/shared nodes are visited once.
        match self.entries.get_mut(idx) {
            Some(Some(entry)) => {
                if entry.marked {
                    return;
                }
                entry.marked = true;
            }
            _ => return,
        }

        // Then enqueue children after releasing the mutable mark borrow.
        let object = match self.entries[idx].as_ref() {
            Some(entry) => &entry.object,
            None => return,
        };

        match object {
            HeapObject::Array(array) => {
                for cell in array.cells() {
                    worklist.push(WorkItem::Value(cell.value.clone()));
                }
            }
            HeapObject::VarList(varlist) => {
                worklist.push(WorkItem::Handle(varlist.keylist));
                worklist.extend(varlist.exit_from.map(WorkItem::Handle));
                for var in &varlist.vars {
                    worklist.push(WorkItem::Value(var.clone()));
                }
            }
            HeapObject::KeyList(keylist) => {
                worklist.extend(keylist.meta.map(WorkItem::Handle));
                if let RootKey::Action(action) = keylist.root {
                    worklist.push(WorkItem::Handle(action));
                }
            }
            HeapObject::Action(action) => {
                worklist.push(WorkItem::Handle(action.paramlist));
                worklist.push(WorkItem::Handle(action.details));
            }
            HeapObject::Pairing { first, second } => {
                worklist.push(WorkItem::Value(first.clone()));
                worklist.push(WorkItem::Value(second.clone()));
            }
            HeapObject::Map { pairlist } => worklist.push(WorkItem::Handle(*pairlist)),
            HeapObject::Bytes(_) | HeapObject::Bitset { .. } | HeapObject::Handle { .. } => {}
        }
    }

    fn sweep(&mut self) {
        for (i, slot) in self.entries.iter_mut().enumerate() {
            if let Some(entry) = slot {
                if entry.marked {
                    entry.marked = false;
                } else {
                    *slot = None;
                    self.free_list.push(i as u32);
                }
            }
        }
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if total_before == 0 {
            return;
        }

        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.gc_threshold = (self.gc_threshold * 2).min(1_000_000);
        } else if ratio > 0.75 {
            self.gc_threshold = (self.gc_threshold / 2).max(MIN_GC_THRESHOLD)
        }
    }
}
