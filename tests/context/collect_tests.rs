#[path = "../common/fixtures.rs"]
mod fixtures;

use bindery::runtime::{
    RuntimeError,
    context::{CollectFlags, Collector, collect_keylist, collect_words, make_selfish_context},
    gc::GcHeap,
    series::make_block,
    symbol::Symbol,
    value::{ContextKind, Value},
};
use fixtures::{object, render_block};
use insta::assert_snapshot;

#[test]
fn duplicate_set_word_fails_and_leaves_collector_reusable() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let [a, b] = ["a", "b"].map(|name| heap.intern(name));
    let head = [Value::set_word(a), Value::set_word(b), Value::set_word(a)];

    let err = collect_keylist(&mut heap, &mut collector, &head, None, CollectFlags::NO_DUP)
        .unwrap_err();

    assert_eq!(err, RuntimeError::DuplicateVariable { name: "a".to_string() });
    assert_eq!(err.to_string(), "duplicate variable: a");
    assert!(collector.binds().is_empty());
    assert!(!collector.is_active());

    let (keylist, _) = collect_keylist(
        &mut heap,
        &mut collector,
        &head[..2],
        None,
        CollectFlags::NO_DUP,
    )
    .unwrap();
    assert_eq!(heap.keylist(keylist).len(), 3);
}

#[test]
fn duplicate_detection_ignores_case() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let [lower, upper] = ["name", "NAME"].map(|name| heap.intern(name));

    let err = collect_keylist(
        &mut heap,
        &mut collector,
        &[Value::set_word(lower), Value::set_word(upper)],
        None,
        CollectFlags::NO_DUP,
    )
    .unwrap_err();

    assert_eq!(err, RuntimeError::DuplicateVariable { name: "NAME".to_string() });
}

#[test]
fn selfish_make_folds_repeated_set_words() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let a = heap.intern("a");

    let ctx = make_selfish_context(
        &mut heap,
        &mut collector,
        ContextKind::Object,
        None,
        None,
        &[Value::set_word(a), Value::Integer(1), Value::set_word(a)],
        None,
    )
    .unwrap();

    let names: Vec<&str> = ctx
        .keys(&heap)
        .iter()
        .map(|key| heap.symbols().resolve(key.symbol))
        .collect();
    assert_eq!(names, ["self", "a"]);
    assert_eq!(ctx.len(&heap), 2);
    assert!(collector.binds().is_empty());
}

#[test]
fn collect_words_skips_prior_and_goes_deep() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let [a, b, c, d] = ["a", "b", "c", "d"].map(|name| heap.intern(name));
    let inner = make_block(&mut heap, [Value::set_word(d), Value::word(c)]);
    let head = [Value::set_word(a), Value::word(b), Value::set_word(c), inner];
    let prior = [Value::word(a)];

    let shallow = collect_words(&mut heap, &mut collector, &head, Some(&prior[..]), CollectFlags::empty());
    assert_snapshot!(render_block(&heap, shallow), @"[c]");

    let deep = collect_words(
        &mut heap,
        &mut collector,
        &head,
        Some(&prior[..]),
        CollectFlags::ANY_WORD | CollectFlags::DEEP,
    );
    assert_snapshot!(render_block(&heap, deep), @"[b c d]");
    assert!(collector.binds().is_empty());
}

#[test]
fn keylist_from_prior_gets_self_and_new_keys() {
    let mut heap = GcHeap::new();
    let mut collector = Collector::default();
    let prior = object(&mut heap, &mut collector, &[("x", Value::Integer(1))]);
    let y = heap.intern("y");

    let (keylist, self_index) = collect_keylist(
        &mut heap,
        &mut collector,
        &[Value::set_word(y)],
        Some(prior),
        CollectFlags::ENSURE_SELF,
    )
    .unwrap();

    assert_eq!(self_index, 1);
    let names: Vec<&str> = heap
        .keylist(keylist)
        .keys()
        .iter()
        .skip(1)
        .map(|key| heap.symbols().resolve(key.symbol))
        .collect();
    assert_eq!(names, ["self", "x", "y"]);
    assert!(heap.keylist(keylist).keys()[1].canon == Symbol::SELF);
}
