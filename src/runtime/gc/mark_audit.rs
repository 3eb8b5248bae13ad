//! Post-mark consistency checks.
//!
//! After the mark phase every node reachable from a root must carry the mark
//! bit. [`assert_cell_marked_correctly`] looks at one cell and confirms that
//! each node its payload refers to is live, marked, and of the shape the
//! cell's kind requires, along with the per-kind invariants below. It never
//! marks anything itself.
//!
//! The match over [`Value`] has no wildcard arm, so a new kind cannot be
//! added without deciding how it is audited.

use thiserror::Error;

use crate::runtime::{
    context::{RootKey, VarListFlags},
    gc::{GcHandle, GcHeap, HeapObject},
    symbol::Symbol,
    value::{ContextKind, ContextValue, Kind, SeriesAt, Value, Word},
};

/// An invariant the mark audit found broken. Each one is a collector or
/// runtime bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkViolation {
    #[error("{kind} cell refers to unmarked node {handle:?}")]
    Unmarked { kind: Kind, handle: GcHandle },

    #[error("{kind} cell refers to freed node {handle:?}")]
    Freed { kind: Kind, handle: GcHandle },

    #[error("{kind} cell expects a {expected} node at {handle:?}, found {found}")]
    WrongShape {
        kind: Kind,
        handle: GcHandle,
        expected: &'static str,
        found: &'static str,
    },

    #[error("frame! context {varlist:?} has no phase")]
    MissingPhase { varlist: GcHandle },

    #[error("{kind} context {varlist:?} carries a phase")]
    UnexpectedPhase { kind: Kind, varlist: GcHandle },

    #[error("{kind} context {varlist:?} carries a binding")]
    UnexpectedBinding { kind: Kind, varlist: GcHandle },

    #[error("archetype of {varlist:?} is {found}")]
    BadArchetype { varlist: GcHandle, found: Kind },

    #[error("{kind} value of {varlist:?} disagrees with its archetype kind {archetype}")]
    KindMismatch {
        kind: Kind,
        archetype: Kind,
        varlist: GcHandle,
    },

    #[error("archetype of {varlist:?} points at {found:?}")]
    ArchetypeMismatch { varlist: GcHandle, found: GcHandle },

    #[error("path {handle:?} has {len} elements")]
    ShortPath { handle: GcHandle, len: usize },

    #[error("path {handle:?} directly contains a {inner}")]
    NestedPath { handle: GcHandle, inner: Kind },

    #[error("bound word has index {index}")]
    BoundIndex { index: i32 },

    #[error("unbound word has index {index}")]
    UnboundIndex { index: i32 },

    #[error("{kind} cell names symbol {symbol:?}, which is not interned")]
    UnknownSymbol { kind: Kind, symbol: Symbol },

    #[error("quoted! holds a quoted!")]
    NestedQuote,

    #[error("quoted! with depth 0")]
    ZeroQuoteDepth,

    #[error("paramlist of action {action:?} does not name it as root")]
    ParamlistRoot { action: GcHandle },

    #[error("{kind} cell refers to non-text bytes {handle:?}")]
    NotText { kind: Kind, handle: GcHandle },

    #[error("bookmark index {index} offset {offset} of {handle:?} is stale")]
    StaleBookmark {
        handle: GcHandle,
        index: usize,
        offset: usize,
    },
}

type Audit<T = ()> = Result<T, MarkViolation>;

/// Returns the node at `handle` after checking it is live and marked.
fn marked_node(heap: &GcHeap, kind: Kind, handle: GcHandle) -> Audit<&HeapObject> {
    let Some(object) = heap.try_get(handle) else {
        return Err(MarkViolation::Freed { kind, handle });
    };
    if !heap.is_marked(handle) {
        return Err(MarkViolation::Unmarked { kind, handle });
    }
    Ok(object)
}

fn marked_shape<'h>(
    heap: &'h GcHeap,
    kind: Kind,
    handle: GcHandle,
    expected: &'static str,
) -> Audit<&'h HeapObject> {
    let object = marked_node(heap, kind, handle)?;
    if object.shape() != expected {
        return Err(MarkViolation::WrongShape {
            kind,
            handle,
            expected,
            found: object.shape(),
        });
    }
    Ok(object)
}

fn interned(heap: &GcHeap, kind: Kind, symbol: Symbol) -> Audit {
    if heap.symbols().contains(symbol) {
        Ok(())
    } else {
        Err(MarkViolation::UnknownSymbol { kind, symbol })
    }
}

/// Checks one cell whose container has already been marked.
pub fn assert_cell_marked_correctly(heap: &GcHeap, value: &Value) -> Audit {
    let kind = value.kind();
    match value {
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
        | Value::Typeset(_) => Ok(()),

        Value::Pair(paired) => marked_shape(heap, kind, *paired, "pairing").map(drop),

        Value::Datatype { spec, .. } => match spec {
            Some(spec) => marked_node(heap, kind, *spec).map(drop),
            None => Ok(()),
        },

        Value::Bitset(bits) => marked_shape(heap, kind, *bits, "bitset").map(drop),

        Value::Map(map) => match marked_shape(heap, kind, *map, "map")? {
            HeapObject::Map { pairlist } => marked_shape(heap, kind, *pairlist, "array").map(drop),
            _ => Ok(()),
        },

        Value::Handle(singular) => match singular {
            // A simple handle has nothing for the collector to see.
            None => Ok(()),
            Some(shared) => marked_shape(heap, kind, *shared, "handle").map(drop),
        },

        Value::Binary(at) => marked_shape(heap, kind, at.series, "bytes").map(drop),

        Value::String(_, at) => audit_text(heap, kind, *at),

        Value::Context(ctx) => audit_context(heap, ctx),

        Value::Varargs { binding, phase } => {
            let object = marked_node(heap, kind, *binding)?;
            if !matches!(object, HeapObject::VarList(_) | HeapObject::Array(_)) {
                return Err(MarkViolation::WrongShape {
                    kind,
                    handle: *binding,
                    expected: "varlist or array",
                    found: object.shape(),
                });
            }
            // No phase when the varargs did not come from a call.
            match phase {
                Some(phase) => marked_shape(heap, kind, *phase, "action").map(drop),
                None => Ok(()),
            }
        }

        Value::Array(_, at) => marked_shape(heap, kind, at.series, "array").map(drop),

        Value::Path(_, at) => audit_path(heap, kind, at.series),

        Value::Word(_, word) => audit_word(heap, kind, word),

        Value::Action(action) => {
            let HeapObject::Action(node) = marked_shape(heap, kind, *action, "action")? else {
                return Ok(());
            };
            marked_shape(heap, kind, node.paramlist, "keylist")?;
            if heap.keylist(node.paramlist).root() != RootKey::Action(*action) {
                return Err(MarkViolation::ParamlistRoot { action: *action });
            }
            marked_shape(heap, kind, node.details, "array").map(drop)
        }

        Value::Quoted { depth, cell } => {
            if *depth == 0 {
                return Err(MarkViolation::ZeroQuoteDepth);
            }
            if matches!(**cell, Value::Quoted { .. }) {
                return Err(MarkViolation::NestedQuote);
            }
            assert_cell_marked_correctly(heap, cell)
        }

        Value::Param(_, symbol) => interned(heap, kind, *symbol),
    }
}

fn audit_text(heap: &GcHeap, kind: Kind, at: SeriesAt) -> Audit {
    let HeapObject::Bytes(bytes) = marked_shape(heap, kind, at.series, "bytes")? else {
        return Ok(());
    };
    if !bytes.is_text() {
        return Err(MarkViolation::NotText {
            kind,
            handle: at.series,
        });
    }

    if let Some(bookmark) = bytes.bookmark() {
        let stale = bookmark.index > bytes.len()
            || !bytes.is_char_boundary(bookmark.offset)
            || bytes.index_for_offset(bookmark.offset) != bookmark.index;
        if stale {
            return Err(MarkViolation::StaleBookmark {
                handle: at.series,
                index: bookmark.index,
                offset: bookmark.offset,
            });
        }
    }
    Ok(())
}

fn audit_context(heap: &GcHeap, ctx: &ContextValue) -> Audit {
    let kind = ctx.kind.kind();
    let HeapObject::VarList(varlist) = marked_shape(heap, kind, ctx.varlist, "varlist")? else {
        return Ok(());
    };

    // Only a FRAME! keeps the binding of the action that spawned it.
    if ctx.binding.is_some() && ctx.kind != ContextKind::Frame {
        return Err(MarkViolation::UnexpectedBinding {
            kind,
            varlist: ctx.varlist,
        });
    }
    if let Some(binding) = ctx.binding {
        marked_node(heap, kind, binding)?;
    }

    match (ctx.phase, ctx.kind) {
        (Some(phase), ContextKind::Frame) => {
            marked_shape(heap, kind, phase, "action")?;
        }
        (None, ContextKind::Frame) => {
            return Err(MarkViolation::MissingPhase {
                varlist: ctx.varlist,
            });
        }
        (Some(_), _) => {
            return Err(MarkViolation::UnexpectedPhase {
                kind,
                varlist: ctx.varlist,
            });
        }
        (None, _) => {}
    }

    if varlist.flags().contains(VarListFlags::INACCESSIBLE) {
        return Ok(());
    }

    match varlist.vars().first() {
        Some(Value::Context(archetype)) => {
            if archetype.kind != ctx.kind {
                return Err(MarkViolation::KindMismatch {
                    kind,
                    archetype: archetype.kind.kind(),
                    varlist: ctx.varlist,
                });
            }
            if archetype.varlist != ctx.varlist {
                return Err(MarkViolation::ArchetypeMismatch {
                    varlist: ctx.varlist,
                    found: archetype.varlist,
                });
            }
            Ok(())
        }
        Some(other) => Err(MarkViolation::BadArchetype {
            varlist: ctx.varlist,
            found: other.kind(),
        }),
        None => Err(MarkViolation::BadArchetype {
            varlist: ctx.varlist,
            found: Kind::Nulled,
        }),
    }
}

fn audit_path(heap: &GcHeap, kind: Kind, series: GcHandle) -> Audit {
    let HeapObject::Array(array) = marked_shape(heap, kind, series, "array")? else {
        return Ok(());
    };
    if array.len() < 2 {
        return Err(MarkViolation::ShortPath {
            handle: series,
            len: array.len(),
        });
    }
    if let Some(inner) = array.values().find(|item| item.kind().is_path()) {
        return Err(MarkViolation::NestedPath {
            handle: series,
            inner: inner.kind(),
        });
    }
    Ok(())
}

fn audit_word(heap: &GcHeap, kind: Kind, word: &Word) -> Audit {
    interned(heap, kind, word.symbol)?;
    match word.binding {
        Some(binding) => {
            marked_shape(heap, kind, binding, "varlist")?;
            if word.index <= 0 {
                return Err(MarkViolation::BoundIndex { index: word.index });
            }
        }
        None => {
            if word.index != crate::runtime::value::UNBOUND_INDEX {
                return Err(MarkViolation::UnboundIndex { index: word.index });
            }
        }
    }
    Ok(())
}

/// Checks every cell held by a marked node and the node links it carries.
///
/// Returns the number of cells checked.
pub fn audit_node(heap: &GcHeap, object: &HeapObject) -> Audit<usize> {
    match object {
        HeapObject::Array(array) => {
            for value in array.values() {
                assert_cell_marked_correctly(heap, value)?;
            }
            Ok(array.len())
        }
        HeapObject::VarList(varlist) => {
            marked_shape(heap, Kind::Object, varlist.keylist(), "keylist")?;
            if let Some(exit_from) = varlist.exit_from() {
                marked_node(heap, Kind::Frame, exit_from)?;
            }
            for value in varlist.vars() {
                assert_cell_marked_correctly(heap, value)?;
            }
            Ok(varlist.vars().len())
        }
        HeapObject::KeyList(keylist) => {
            if let Some(meta) = keylist.meta() {
                marked_shape(heap, Kind::Object, meta, "varlist")?;
            }
            if let RootKey::Action(action) = keylist.root() {
                marked_shape(heap, Kind::Action, action, "action")?;
            }
            Ok(0)
        }
        HeapObject::Action(action) => {
            marked_shape(heap, Kind::Action, action.paramlist, "keylist")?;
            marked_shape(heap, Kind::Action, action.details, "array")?;
            Ok(0)
        }
        HeapObject::Pairing { first, second } => {
            assert_cell_marked_correctly(heap, first)?;
            assert_cell_marked_correctly(heap, second)?;
            Ok(2)
        }
        HeapObject::Map { pairlist } => {
            marked_shape(heap, Kind::Map, *pairlist, "array")?;
            Ok(0)
        }
        HeapObject::Bytes(_) | HeapObject::Bitset { .. } | HeapObject::Handle { .. } => Ok(0),
    }
}
