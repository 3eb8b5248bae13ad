use bindery::runtime::{
    RuntimeConfig,
    gc::{GcHandle, GcHeap},
    modify::{ModifyFlags, Verb, modify_string_or_binary},
    series::make_text,
    value::{SeriesAt, StringKind, Value},
};
use proptest::prelude::*;

fn text(heap: &mut GcHeap, s: &str) -> GcHandle {
    match make_text(heap, s) {
        Value::String(_, at) => at.series,
        other => panic!("make_text gave {}", other.kind()),
    }
}

fn at(series: GcHandle, index: usize) -> Value {
    Value::String(StringKind::Text, SeriesAt::at(series, index))
}

/// Codepoint-level model of a text edit; `part` counts codepoints.
fn model(
    dst: &mut Vec<char>,
    verb: Verb,
    index: usize,
    src: &[char],
    part: Option<usize>,
    dups: i64,
) -> usize {
    let limit = part.filter(|_| verb != Verb::Change);
    if dups <= 0 || limit == Some(0) {
        return if verb == Verb::Append { 0 } else { index };
    }
    let index = if verb == Verb::Append { dst.len() } else { index.min(dst.len()) };
    let taken = &src[..limit.unwrap_or(src.len()).min(src.len())];
    let material: Vec<char> = taken
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

fn chars(max: usize) -> impl Strategy<Value = Vec<char>> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', 'z', 'é', '€', '𝄞']), 0..max)
}

fn verb() -> impl Strategy<Value = Verb> {
    prop_oneof![Just(Verb::Insert), Just(Verb::Append), Just(Verb::Change)]
}

fn assert_bookmark_consistent(heap: &GcHeap, series: GcHandle) {
    let bytes = heap.bytes(series);
    if let Some(mark) = bytes.bookmark() {
        assert!(mark.index <= bytes.len(), "bookmark {mark:?} past len {}", bytes.len());
        assert!(bytes.is_char_boundary(mark.offset), "bookmark {mark:?} inside a codepoint");
        assert_eq!(bytes.index_for_offset(mark.offset), mark.index);
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn text_edit_matches_char_model(
        dst in chars(10),
        src in chars(5),
        verb in verb(),
        index in 0usize..12,
        part in prop::option::of(0usize..6),
        dups in -1i64..3,
    ) {
        let mut heap = GcHeap::new();
        let dst_text: String = dst.iter().collect();
        let src_text: String = src.iter().collect();
        let target = text(&mut heap, &dst_text);
        let source = make_text(&mut heap, &src_text);
        let mut flags = ModifyFlags::empty();
        if part.is_some() {
            flags |= ModifyFlags::PART;
        }

        let got = modify_string_or_binary(
            &mut heap,
            &at(target, index),
            verb,
            &source,
            flags,
            part.unwrap_or(0),
            dups,
        )
        .unwrap();

        let mut expected = dst.clone();
        let want = model(&mut expected, verb, index, &src, part, dups);
        let expected: String = expected.into_iter().collect();
        prop_assert_eq!(heap.bytes(target).as_str(), Some(expected.as_str()));
        prop_assert_eq!(heap.bytes(target).len(), expected.chars().count());
        prop_assert_eq!(got, want);
    }

    #[test]
    fn bookmark_survives_edit_sequences(
        start in chars(12),
        edits in prop::collection::vec((verb(), 0usize..14, chars(4), prop::option::of(0usize..4)), 1..8),
    ) {
        let config = RuntimeConfig::from_json(r#"{ "bookmark_min_len": 1 }"#).unwrap();
        let mut heap = GcHeap::with_config(config);
        let start: String = start.iter().collect();
        let target = text(&mut heap, &start);
        let mut model_text: Vec<char> = start.chars().collect();

        for (verb, index, src, part) in edits {
            let src_text: String = src.iter().collect();
            let source = make_text(&mut heap, &src_text);
            let mut flags = ModifyFlags::empty();
            if part.is_some() {
                flags |= ModifyFlags::PART;
            }

            modify_string_or_binary(
                &mut heap,
                &at(target, index),
                verb,
                &source,
                flags,
                part.unwrap_or(0),
                1,
            )
            .unwrap();
            model(&mut model_text, verb, index, &src, part, 1);

            assert_bookmark_consistent(&heap, target);
            let expected: String = model_text.iter().collect();
            prop_assert_eq!(heap.bytes(target).as_str(), Some(expected.as_str()));
        }
    }
}

#[test]
fn change_grows_a_codepoint() {
    let mut heap = GcHeap::new();
    let target = text(&mut heap, "abcd");
    let clef = make_text(&mut heap, "𝄞");

    let index = modify_string_or_binary(
        &mut heap,
        &at(target, 0),
        Verb::Change,
        &clef,
        ModifyFlags::empty(),
        0,
        1,
    )
    .unwrap();

    assert_eq!(index, 1);
    assert_eq!(heap.bytes(target).as_str(), Some("𝄞bcd"));
    assert_eq!(heap.bytes(target).len(), 4);
    assert_eq!(heap.bytes(target).size(), 7);
}
