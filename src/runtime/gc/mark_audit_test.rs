use crate::runtime::{
    action::{make_action, make_frame},
    context::{Collector, alloc_context, make_selfish_context},
    gc::{GcHandle, GcHeap, HeapObject, MarkViolation, assert_cell_marked_correctly},
    series::{Array, Bookmark, make_array, make_binary, make_block, make_text},
    symbol::Symbol,
    typeset::TypeBits,
    value::{
        ArrayKind, ContextKind, ContextValue, Date, Kind, ParamClass, PathKind, SeriesAt,
        StringKind, Tuple, Value, Word, WordKind,
    },
};

fn path(heap: &mut GcHeap, kind: PathKind, items: Vec<Value>) -> Value {
    let series = make_array(heap, Array::from_values(items));
    Value::Path(kind, SeriesAt::head(series))
}

/// A well-formed value of every kind, each holding whatever heap nodes that
/// kind can reference.
fn sample(heap: &mut GcHeap, kind: Kind) -> Value {
    let a = heap.intern("a");
    let b = heap.intern("b");
    match kind {
        Kind::Nulled => Value::Nulled,
        Kind::Void => Value::Void,
        Kind::Blank => Value::Blank,
        Kind::Logic => Value::Logic(true),
        Kind::Integer => Value::Integer(42),
        Kind::Decimal => Value::Decimal(1.5),
        Kind::Percent => Value::Percent(0.5),
        Kind::Char => Value::Char('ü'),
        Kind::Pair => Value::Pair(heap.alloc(HeapObject::Pairing {
            first: Value::Integer(1),
            second: Value::Integer(2),
        })),
        Kind::Tuple => Value::Tuple(Tuple {
            len: 3,
            bytes: [1, 2, 3, 0, 0, 0, 0],
        }),
        Kind::Time => Value::Time(3_600_000_000_000),
        Kind::Date => Value::Date(Date {
            year: 2024,
            month: 2,
            day: 29,
        }),
        Kind::Datatype => {
            let spec = make_array(heap, Array::new());
            Value::Datatype {
                kind: Kind::Integer,
                spec: Some(spec),
            }
        }
        Kind::Typeset => Value::Typeset(TypeBits::of(&[Kind::Integer, Kind::Text])),
        Kind::Bitset => Value::Bitset(heap.alloc(HeapObject::Bitset {
            bits: vec![0b1010],
            negated: false,
        })),
        Kind::Map => {
            let pairlist = make_array(heap, Array::new());
            Value::Map(heap.alloc(HeapObject::Map { pairlist }))
        }
        Kind::Handle => Value::Handle(Some(heap.alloc(HeapObject::Handle { data: 7 }))),
        Kind::Binary => make_binary(heap, &[0xde, 0xad]),
        Kind::Text => make_text(heap, "text"),
        Kind::File | Kind::Email | Kind::Url | Kind::Tag => {
            let string_kind = match kind {
                Kind::File => StringKind::File,
                Kind::Email => StringKind::Email,
                Kind::Url => StringKind::Url,
                _ => StringKind::Tag,
            };
            match make_text(heap, "x@y") {
                Value::String(_, at) => Value::String(string_kind, at),
                other => other,
            }
        }
        Kind::Issue => Value::Word(WordKind::Issue, Word::unbound(a)),
        Kind::Object | Kind::Module | Kind::Error | Kind::Port => {
            let context_kind = match kind {
                Kind::Object => ContextKind::Object,
                Kind::Module => ContextKind::Module,
                Kind::Error => ContextKind::Error,
                _ => ContextKind::Port,
            };
            let mut collector = Collector::default();
            make_selfish_context(
                heap,
                &mut collector,
                context_kind,
                None,
                None,
                &[Value::set_word(a)],
                None,
            )
            .unwrap()
            .value(heap)
        }
        Kind::Frame => {
            let body = make_array(heap, Array::new());
            let action = make_action(heap, &[a], body);
            make_frame(heap, action).value(heap)
        }
        Kind::Varargs => {
            let frame = alloc_context(heap, ContextKind::Object, 0);
            let body = make_array(heap, Array::new());
            let action = make_action(heap, &[], body);
            Value::Varargs {
                binding: frame.varlist(),
                phase: Some(action),
            }
        }
        Kind::Block
        | Kind::SetBlock
        | Kind::GetBlock
        | Kind::Group
        | Kind::SetGroup
        | Kind::GetGroup => {
            let array_kind = match kind {
                Kind::Block => ArrayKind::Block,
                Kind::SetBlock => ArrayKind::SetBlock,
                Kind::GetBlock => ArrayKind::GetBlock,
                Kind::Group => ArrayKind::Group,
                Kind::SetGroup => ArrayKind::SetGroup,
                _ => ArrayKind::GetGroup,
            };
            match make_block(heap, [Value::Integer(1)]) {
                Value::Array(_, at) => Value::Array(array_kind, at),
                other => other,
            }
        }
        Kind::Path | Kind::SetPath | Kind::GetPath => {
            let path_kind = match kind {
                Kind::Path => PathKind::Path,
                Kind::SetPath => PathKind::SetPath,
                _ => PathKind::GetPath,
            };
            path(heap, path_kind, vec![Value::word(a), Value::word(b)])
        }
        Kind::Word | Kind::SetWord | Kind::GetWord => {
            let word_kind = match kind {
                Kind::Word => WordKind::Word,
                Kind::SetWord => WordKind::SetWord,
                _ => WordKind::GetWord,
            };
            let ctx = alloc_context(heap, ContextKind::Object, 1);
            Value::Word(word_kind, Word::bound(a, ctx.varlist(), 1))
        }
        Kind::Action => {
            let body = make_array(heap, Array::new());
            Value::Action(make_action(heap, &[a, b], body))
        }
        Kind::Quoted => Value::Quoted {
            depth: 2,
            cell: Box::new(make_block(heap, [])),
        },
        Kind::Param => Value::Param(ParamClass::Refinement, b),
    }
}

fn marked(heap: &mut GcHeap, value: &Value) -> Result<(), MarkViolation> {
    heap.mark(std::slice::from_ref(value));
    assert_cell_marked_correctly(heap, value)
}

#[test]
fn every_kind_has_a_passing_sample() {
    for kind in Kind::ALL {
        let mut heap = GcHeap::new();
        let value = sample(&mut heap, kind);
        assert_eq!(value.kind(), kind);
        assert_eq!(marked(&mut heap, &value), Ok(()), "{kind} sample failed audit");
    }
}

#[test]
fn every_kind_survives_a_full_collection() {
    let mut heap = GcHeap::new();
    let roots: Vec<Value> = Kind::ALL.iter().map(|kind| sample(&mut heap, *kind)).collect();
    heap.alloc(HeapObject::Pairing {
        first: Value::Blank,
        second: Value::Blank,
    });

    let freed = heap.collect(&roots);

    assert_eq!(freed, 1);
}

#[test]
fn unmarked_referent_is_reported() {
    let mut heap = GcHeap::new();
    let block = make_block(&mut heap, [Value::Integer(1)]);
    let series = block.as_array().unwrap().series;

    let violation = assert_cell_marked_correctly(&heap, &block).unwrap_err();

    assert_eq!(
        violation,
        MarkViolation::Unmarked {
            kind: Kind::Block,
            handle: series
        }
    );
}

#[test]
fn freed_referent_is_reported() {
    let mut heap = GcHeap::new();
    let block = make_block(&mut heap, []);
    heap.collect(&[]);

    let violation = assert_cell_marked_correctly(&heap, &block).unwrap_err();
    assert!(matches!(violation, MarkViolation::Freed { kind: Kind::Block, .. }));
}

#[test]
fn wrong_node_shape_is_reported() {
    let mut heap = GcHeap::new();
    let bytes = make_text(&mut heap, "no");
    let Value::String(_, at) = bytes else {
        unreachable!()
    };
    let bogus = Value::Array(ArrayKind::Block, at);

    let violation = marked(&mut heap, &bogus).unwrap_err();
    assert!(matches!(
        violation,
        MarkViolation::WrongShape {
            expected: "array",
            found: "bytes",
            ..
        }
    ));
}

#[test]
fn frame_needs_phase_and_others_must_not_have_one() {
    let mut heap = GcHeap::new();
    let ctx = alloc_context(&mut heap, ContextKind::Frame, 0);
    let frame = ctx.value(&heap);
    assert_eq!(
        marked(&mut heap, &frame),
        Err(MarkViolation::MissingPhase {
            varlist: ctx.varlist()
        })
    );

    let body = make_array(&mut heap, Array::new());
    let action = make_action(&mut heap, &[], body);
    let object = alloc_context(&mut heap, ContextKind::Object, 0);
    let with_phase = Value::Context(ContextValue {
        phase: Some(action),
        ..object.archetype(&heap)
    });
    assert!(matches!(
        marked(&mut heap, &with_phase),
        Err(MarkViolation::UnexpectedPhase {
            kind: Kind::Object,
            ..
        })
    ));
}

#[test]
fn binding_only_on_frames() {
    let mut heap = GcHeap::new();
    let object = alloc_context(&mut heap, ContextKind::Object, 0);
    let other = alloc_context(&mut heap, ContextKind::Object, 0);
    let bound = Value::Context(ContextValue {
        binding: Some(other.varlist()),
        ..object.archetype(&heap)
    });

    assert!(matches!(
        marked(&mut heap, &bound),
        Err(MarkViolation::UnexpectedBinding { .. })
    ));
}

#[test]
fn archetype_must_point_home() {
    let mut heap = GcHeap::new();
    let ctx = alloc_context(&mut heap, ContextKind::Object, 0);
    let elsewhere = alloc_context(&mut heap, ContextKind::Object, 0);
    if let Value::Context(archetype) = &mut heap.varlist_mut(ctx.varlist()).vars[0] {
        archetype.varlist = elsewhere.varlist();
    }
    let value = Value::Context(ContextValue {
        varlist: ctx.varlist(),
        ..elsewhere.archetype(&heap)
    });

    assert_eq!(
        marked(&mut heap, &value),
        Err(MarkViolation::ArchetypeMismatch {
            varlist: ctx.varlist(),
            found: elsewhere.varlist()
        })
    );
}

#[test]
fn context_kind_must_match_archetype() {
    let mut heap = GcHeap::new();
    let ctx = alloc_context(&mut heap, ContextKind::Module, 0);
    let value = Value::Context(ContextValue {
        kind: ContextKind::Error,
        ..ctx.archetype(&heap)
    });

    assert!(matches!(
        marked(&mut heap, &value),
        Err(MarkViolation::KindMismatch {
            kind: Kind::Error,
            archetype: Kind::Module,
            ..
        })
    ));
}

#[test]
fn short_and_nested_paths_are_rejected() {
    let mut heap = GcHeap::new();
    let a = heap.intern("a");

    let short = path(&mut heap, PathKind::Path, vec![Value::word(a)]);
    assert!(matches!(
        marked(&mut heap, &short),
        Err(MarkViolation::ShortPath { len: 1, .. })
    ));

    let inner = path(&mut heap, PathKind::Path, vec![Value::word(a), Value::word(a)]);
    let outer = path(&mut heap, PathKind::GetPath, vec![Value::word(a), inner]);
    assert!(matches!(
        marked(&mut heap, &outer),
        Err(MarkViolation::NestedPath {
            inner: Kind::Path,
            ..
        })
    ));
}

#[test]
fn word_indexes_follow_binding() {
    let mut heap = GcHeap::new();
    let a = heap.intern("a");
    let ctx = alloc_context(&mut heap, ContextKind::Object, 0);

    let bound_at_zero = Value::Word(
        WordKind::Word,
        Word {
            symbol: a,
            binding: Some(ctx.varlist()),
            index: 0,
        },
    );
    assert_eq!(
        marked(&mut heap, &bound_at_zero),
        Err(MarkViolation::BoundIndex { index: 0 })
    );

    let unbound_with_index = Value::Word(
        WordKind::GetWord,
        Word {
            symbol: a,
            binding: None,
            index: 3,
        },
    );
    assert_eq!(
        marked(&mut heap, &unbound_with_index),
        Err(MarkViolation::UnboundIndex { index: 3 })
    );
}

#[test]
fn unknown_symbols_are_rejected() {
    let mut heap = GcHeap::new();
    let param = Value::Param(ParamClass::Normal, Symbol::SELF);
    assert_eq!(marked(&mut heap, &param), Ok(()));

    let other = GcHeap::new();
    let mut big = GcHeap::new();
    let far = (0..10).map(|i| big.intern(&format!("w{i}"))).last().unwrap();
    let value = Value::word(far);
    assert_eq!(
        assert_cell_marked_correctly(&other, &value),
        Err(MarkViolation::UnknownSymbol {
            kind: Kind::Word,
            symbol: far
        })
    );
}

#[test]
fn nested_quote_is_rejected() {
    let mut heap = GcHeap::new();
    let value = Value::Quoted {
        depth: 1,
        cell: Box::new(Value::Quoted {
            depth: 1,
            cell: Box::new(Value::Integer(1)),
        }),
    };

    assert_eq!(marked(&mut heap, &value), Err(MarkViolation::NestedQuote));
}

#[test]
fn quoted_payload_is_audited() {
    let mut heap = GcHeap::new();
    let block = make_block(&mut heap, []);
    let value = Value::Quoted {
        depth: 1,
        cell: Box::new(block),
    };

    assert!(assert_cell_marked_correctly(&heap, &value).is_err());
    assert_eq!(marked(&mut heap, &value), Ok(()));
}

#[test]
fn action_paramlist_must_name_the_action() {
    let mut heap = GcHeap::new();
    let body = make_array(&mut heap, Array::new());
    let first = make_action(&mut heap, &[], body);
    let second = make_action(&mut heap, &[], body);
    let paramlist = heap.action(first).paramlist;
    heap.action_mut(second).paramlist = paramlist;

    assert_eq!(
        marked(&mut heap, &Value::Action(second)),
        Err(MarkViolation::ParamlistRoot { action: second })
    );
}

#[test]
fn stale_bookmark_is_reported() {
    let mut heap = GcHeap::new();
    let text = make_text(&mut heap, "añb");
    let series = text.as_text_series();
    heap.bytes_mut(series).set_bookmark(Some(Bookmark {
        index: 2,
        offset: 2,
    }));

    assert!(matches!(
        marked(&mut heap, &text),
        Err(MarkViolation::StaleBookmark {
            index: 2,
            offset: 2,
            ..
        })
    ));

    heap.bytes_mut(series).set_bookmark(Some(Bookmark {
        index: 1,
        offset: 3,
    }));
    assert!(marked(&mut heap, &text).is_err());

    heap.bytes_mut(series).set_bookmark(Some(Bookmark {
        index: 2,
        offset: 3,
    }));
    assert_eq!(marked(&mut heap, &text), Ok(()));
}

#[test]
fn audit_counts_checked_cells() {
    let mut heap = GcHeap::new();
    let block = make_block(&mut heap, [Value::Integer(1), Value::Integer(2)]);
    let roots = [block];

    heap.mark(&roots);
    assert_eq!(heap.audit(&roots), Ok(3));
}

trait TextSeries {
    fn as_text_series(&self) -> GcHandle;
}

impl TextSeries for Value {
    fn as_text_series(&self) -> GcHandle {
        match self {
            Value::String(_, at) => at.series,
            other => panic!("expected a string, got {}", other.kind()),
        }
    }
}
