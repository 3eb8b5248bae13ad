#[path = "../common/fixtures.rs"]
mod fixtures;

use bindery::runtime::{
    RuntimeConfig,
    action::{make_action, make_frame},
    context::{Collector, find_key_index},
    gc::{GcHeap, MarkViolation},
    series::{make_block, make_text},
    stats,
    value::Value,
};
use fixtures::object;

#[test]
fn objects_frames_and_actions_survive_collection() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();

    let x = heap.intern("x");
    let body = make_block(&mut heap, [Value::word(x)]);
    let body = body.as_array().unwrap().series;
    let action = make_action(&mut heap, &[x], body);
    let frame = make_frame(&mut heap, action);
    let argument = make_text(&mut heap, "argument");
    *frame.var_mut(&mut heap, 1) = argument.clone();

    let frame_value = frame.value(&heap);
    let holder = make_block(&mut heap, [frame_value]);
    let root = object(&mut heap, &mut collector, &[("calls", holder), ("n", Value::Integer(1))]);
    let garbage = object(&mut heap, &mut collector, &[("lost", Value::Integer(2))]);

    let audits_before = stats::snapshot().audited_cycles;
    let freed = heap.collect(&[root.value(&heap)]);

    assert!(freed > 0);
    assert!(heap.try_get(garbage.varlist()).is_none());
    assert!(heap.try_get(root.varlist()).is_some());
    assert!(heap.try_get(frame.varlist()).is_some());
    assert!(heap.try_get(action).is_some());
    assert!(heap.try_get(body).is_some());
    assert_eq!(frame.var(&heap, 1), &argument);
    let Value::String(_, at) = argument else {
        unreachable!()
    };
    assert_eq!(heap.bytes(at.series).as_str(), Some("argument"));
    assert!(stats::snapshot().audited_cycles > audits_before);
    assert_eq!(heap.total_collections(), 1);
}

#[test]
fn collection_is_repeatable() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let root = object(&mut heap, &mut collector, &[("a", Value::Integer(1))]);
    let roots = [root.value(&heap)];

    heap.collect(&roots);
    let live = heap.live_count();
    assert_eq!(heap.collect(&roots), 0);
    assert_eq!(heap.live_count(), live);

    let a = heap.intern("a");
    assert_eq!(root.var(&heap, find_key_index(&heap, root, a, false)), &Value::Integer(1));
}

#[test]
fn audit_rejects_roots_that_were_never_marked() {
    let mut heap = GcHeap::new();
    let block = make_block(&mut heap, [Value::Integer(1)]);

    let err = heap.audit(std::slice::from_ref(&block)).unwrap_err();
    assert!(matches!(err, MarkViolation::Unmarked { .. }));

    heap.mark(std::slice::from_ref(&block));
    assert_eq!(heap.audit(std::slice::from_ref(&block)).ok(), Some(2));
}

#[test]
fn unaudited_heap_still_collects() {
    let config = RuntimeConfig::from_json(r#"{ "audit_marks": false }"#).unwrap();
    let mut heap = GcHeap::with_config(config);
    let mut collector = Collector::default();
    let kept = object(&mut heap, &mut collector, &[("k", Value::Integer(1))]);
    let dropped = object(&mut heap, &mut collector, &[("d", Value::Integer(2))]);

    let freed = heap.collect(&[kept.value(&heap)]);

    assert!(freed > 0);
    assert!(heap.try_get(kept.varlist()).is_some());
    assert!(heap.try_get(dropped.varlist()).is_none());
}
