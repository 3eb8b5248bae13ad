#[path = "../common/fixtures.rs"]
mod fixtures;

use bindery::runtime::{
    gc::GcHeap,
    modify::{ModifyFlags, Verb, modify_array},
    value::Value,
};
use fixtures::{int_contents, ints};
use proptest::prelude::*;

/// What INSERT/APPEND/CHANGE of a spliced block must do, on a plain `Vec`.
fn model(
    dst: &mut Vec<i64>,
    verb: Verb,
    index: usize,
    src: &[i64],
    part: Option<usize>,
    dups: i64,
) -> usize {
    if dups <= 0 {
        return if verb == Verb::Append { 0 } else { index };
    }
    let index = if verb == Verb::Append { dst.len() } else { index.min(dst.len()) };
    let taken = match part {
        Some(part) if verb != Verb::Change => &src[..part.min(src.len())],
        _ => src,
    };
    let material: Vec<i64> = taken
        .iter()
        .copied()
        .cycle()
        .take(taken.len() * dups as usize)
        .collect();
    let size = material.len();

    let replaced = match verb {
        Verb::Change => part.unwrap_or(size).min(dst.len() - index),
        _ => 0,
    };
    dst.splice(index..index + replaced, material);

    if verb == Verb::Append { 0 } else { index + size }
}

fn verb() -> impl Strategy<Value = Verb> {
    prop_oneof![Just(Verb::Insert), Just(Verb::Append), Just(Verb::Change)]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn spliced_block_matches_vec_model(
        dst in prop::collection::vec(-50i64..50, 0..8),
        src in prop::collection::vec(100i64..200, 0..5),
        verb in verb(),
        index in 0usize..10,
        part in prop::option::of(0usize..6),
        dups in -1i64..4,
    ) {
        let mut heap = GcHeap::new();
        let target = ints(&mut heap, &dst);
        let source = Value::block(ints(&mut heap, &src));
        let mut flags = ModifyFlags::SPLICE;
        if part.is_some() {
            flags |= ModifyFlags::PART;
        }

        let got = modify_array(
            &mut heap,
            verb,
            target,
            index,
            &source,
            flags,
            part.unwrap_or(0),
            dups,
        )
        .unwrap();

        let mut expected = dst.clone();
        let want = model(&mut expected, verb, index, &src, part, dups);
        prop_assert_eq!(int_contents(&heap, target), expected);
        prop_assert_eq!(got, want);
    }

    #[test]
    fn single_value_matches_vec_model(
        dst in prop::collection::vec(-50i64..50, 0..8),
        value in 100i64..200,
        verb in verb(),
        index in 0usize..10,
        dups in 1i64..4,
    ) {
        let mut heap = GcHeap::new();
        let target = ints(&mut heap, &dst);

        let got = modify_array(
            &mut heap,
            verb,
            target,
            index,
            &Value::Integer(value),
            ModifyFlags::empty(),
            0,
            dups,
        )
        .unwrap();

        let mut expected = dst.clone();
        let want = model(&mut expected, verb, index, &[value], None, dups);
        prop_assert_eq!(int_contents(&heap, target), expected);
        prop_assert_eq!(got, want);
    }
}

#[test]
fn insert_block_into_itself() {
    let mut heap = GcHeap::new();
    let target = ints(&mut heap, &[10, 20, 30]);

    let index = modify_array(
        &mut heap,
        Verb::Insert,
        target,
        1,
        &Value::block(target),
        ModifyFlags::SPLICE,
        0,
        1,
    )
    .unwrap();

    assert_eq!(int_contents(&heap, target), [10, 10, 20, 30, 20, 30]);
    assert_eq!(index, 4);
}

#[test]
fn change_with_part_deletes_the_rest() {
    let mut heap = GcHeap::new();
    let target = ints(&mut heap, &[1, 2, 3, 4, 5]);

    let index = modify_array(
        &mut heap,
        Verb::Change,
        target,
        0,
        &Value::Integer(0),
        ModifyFlags::PART,
        4,
        1,
    )
    .unwrap();

    assert_eq!(int_contents(&heap, target), [0, 5]);
    assert_eq!(index, 1);
}
