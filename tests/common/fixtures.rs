#![allow(dead_code)]

use bindery::runtime::{
    context::{Collector, Context, construct_context},
    gc::{GcHandle, GcHeap},
    mold::mold,
    series::make_block,
    value::{ContextKind, Value},
};

/// Builds an object from `name: value` pairs without evaluating anything.
pub fn object(heap: &mut GcHeap, collector: &mut Collector, pairs: &[(&str, Value)]) -> Context {
    let mut spec = Vec::with_capacity(pairs.len() * 2);
    for (name, value) in pairs {
        spec.push(Value::set_word(heap.intern(name)));
        spec.push(value.clone());
    }
    let block = make_block(heap, spec);
    let head = block.as_array().unwrap();
    construct_context(heap, collector, ContextKind::Object, head, None).unwrap()
}

pub fn ints(heap: &mut GcHeap, values: &[i64]) -> GcHandle {
    let block = make_block(heap, values.iter().copied().map(Value::Integer));
    block.as_array().unwrap().series
}

pub fn int_contents(heap: &GcHeap, array: GcHandle) -> Vec<i64> {
    heap.array(array)
        .values()
        .map(|value| match value {
            Value::Integer(i) => *i,
            other => panic!("expected integer!, got {}", other.kind()),
        })
        .collect()
}

pub fn render(heap: &GcHeap, ctx: Context) -> String {
    mold(heap, &ctx.value(heap))
}

pub fn render_block(heap: &GcHeap, array: GcHandle) -> String {
    mold(heap, &Value::block(array))
}
