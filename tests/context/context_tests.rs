#[path = "../common/fixtures.rs"]
mod fixtures;

use bindery::runtime::{
    RuntimeConfig, RuntimeError,
    context::{
        Collector, KeySource, OnlyWords, ReflectMode, alloc_context, append_key, context_to_array,
        copy_shallow, expand_context, find_value, lock_context, make_selfish_context,
        merge_contexts, resolve,
    },
    gc::GcHeap,
    value::{ContextKind, Value},
};
use fixtures::{object, render, render_block};
use insta::assert_snapshot;

#[test]
fn reflect_words_and_values_in_key_order() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let ctx = object(
        &mut heap,
        &mut collector,
        &[
            ("a", Value::Integer(1)),
            ("b", Value::Integer(2)),
            ("c", Value::Integer(3)),
        ],
    );

    let words = context_to_array(&mut heap, ctx, ReflectMode::Words);
    assert_snapshot!(render_block(&heap, words), @"[a b c]");

    let values = context_to_array(&mut heap, ctx, ReflectMode::Values);
    assert_snapshot!(render_block(&heap, values), @"[1 2 3]");

    let both = context_to_array(&mut heap, ctx, ReflectMode::WordsAndValues);
    assert_snapshot!(render_block(&heap, both).replace('\n', "|"), @"[|a: 1|b: 2|c: 3]");
}

#[test]
fn shallow_copy_shares_keylist_only_without_extra() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let original = object(&mut heap, &mut collector, &[("a", Value::Integer(1))]);

    let twin = copy_shallow(&mut heap, original, 0);
    assert_eq!(twin.keylist(&heap), original.keylist(&heap));
    assert!(heap.keylist(twin.keylist(&heap)).is_shared());

    let roomy = copy_shallow(&mut heap, original, 4);
    assert_ne!(roomy.keylist(&heap), original.keylist(&heap));
    assert!(!heap.keylist(roomy.keylist(&heap)).is_shared());
}

#[test]
fn expanding_a_shared_keylist_leaves_siblings_alone() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let original = object(&mut heap, &mut collector, &[("a", Value::Integer(1))]);
    let twin = copy_shallow(&mut heap, original, 0);
    let keys_before = original.keys(&heap).to_vec();

    expand_context(&mut heap, twin, 1);
    let b = heap.intern("b");
    *append_key(&mut heap, twin, KeySource::Symbol(b), false) = Value::Integer(2);

    assert_eq!(original.keys(&heap), keys_before.as_slice());
    assert_snapshot!(render(&heap, original), @"make object! [a: 1]");
    assert_snapshot!(render(&heap, twin), @"make object! [a: 1 b: 2]");
}

#[test]
fn appended_keys_fill_slots_in_order() {
    let mut heap = GcHeap::new();
    let ctx = alloc_context(&mut heap, ContextKind::Object, 0);

    for (i, name) in ["p", "q", "r", "s"].iter().enumerate() {
        let symbol = heap.intern(name);
        *append_key(&mut heap, ctx, KeySource::Symbol(symbol), false) = Value::Integer(i as i64);
    }

    assert_eq!(ctx.len(&heap), 4);
    for (i, name) in ["p", "q", "r", "s"].iter().enumerate() {
        assert_eq!(ctx.key(&heap, i + 1).symbol, heap.intern(name));
        assert_eq!(ctx.var(&heap, i + 1), &Value::Integer(i as i64));
    }
}

#[test]
fn merge_takes_second_parent_values() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let p1 = object(
        &mut heap,
        &mut collector,
        &[("x", Value::Integer(1)), ("y", Value::Integer(2))],
    );
    let p2 = object(
        &mut heap,
        &mut collector,
        &[("y", Value::Integer(3)), ("z", Value::Integer(4))],
    );

    let child = merge_contexts(&mut heap, &mut collector, p1, p2);

    assert_snapshot!(render(&heap, child), @"make object! [x: 1 y: 3 z: 4]");
    assert_snapshot!(render(&heap, p1), @"make object! [x: 1 y: 2]");
}

#[test]
fn derived_object_inherits_and_extends() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let parent = object(
        &mut heap,
        &mut collector,
        &[("name", Value::Integer(1)), ("size", Value::Integer(2))],
    );
    let extra = heap.intern("extra");

    let child = make_selfish_context(
        &mut heap,
        &mut collector,
        ContextKind::Object,
        None,
        None,
        &[Value::set_word(extra)],
        Some(parent),
    )
    .unwrap();

    assert_snapshot!(render(&heap, child), @"make object! [name: 1 size: 2 extra: _]");
}

#[test]
fn resolve_respects_existing_values() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let target = object(
        &mut heap,
        &mut collector,
        &[("a", Value::Integer(1)), ("b", Value::Void)],
    );
    let source = object(
        &mut heap,
        &mut collector,
        &[("a", Value::Integer(10)), ("b", Value::Integer(20)), ("c", Value::Integer(30))],
    );

    resolve(&mut heap, &mut collector, target, source, OnlyWords::All, false, false).unwrap();
    assert_snapshot!(render(&heap, target), @"make object! [a: 1 b: 20]");

    resolve(&mut heap, &mut collector, target, source, OnlyWords::All, true, true).unwrap();
    assert_snapshot!(render(&heap, target), @"make object! [a: 10 b: 20 c: 30]");
    assert!(collector.binds().is_empty());
}

#[test]
fn locked_context_rejects_resolve() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let target = object(&mut heap, &mut collector, &[("a", Value::Void)]);
    let source = object(&mut heap, &mut collector, &[("a", Value::Integer(1))]);
    lock_context(&mut heap, target);

    let err = resolve(&mut heap, &mut collector, target, source, OnlyWords::All, true, false)
        .unwrap_err();

    assert_eq!(err, RuntimeError::LockedContext);
    assert_eq!(err.to_string(), "context is locked");
    let a = heap.intern("a");
    assert_eq!(find_value(&heap, target, a), Some(&Value::Void));
}

#[test]
fn collector_sized_from_config() {
    let config = RuntimeConfig::from_json(r#"{ "collect_buffer_capacity": 4 }"#).unwrap();
    let mut heap = GcHeap::with_config(config.clone());
    let mut collector = Collector::from_config(&config);

    let pairs: Vec<(String, Value)> = (0..10)
        .map(|i| (format!("k{i}"), Value::Integer(i)))
        .collect();
    let pairs: Vec<(&str, Value)> = pairs
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    let ctx = object(&mut heap, &mut collector, &pairs);

    assert_eq!(ctx.len(&heap), 11);
    assert_eq!(heap.config().collect_buffer_capacity, 4);
}
