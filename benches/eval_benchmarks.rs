//! Benchmarks for repeated evaluation of pre-compiled expressions.
//!
//! The engine's whole point is bind-once/evaluate-many: these benches
//! measure the steady-state evaluate path, not binding.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use exprbind::prelude::*;

fn arithmetic_tree() -> SyntaxNode {
    // (x * 2 + 7) % 5, over an i64 parameter.
    let x = SyntaxNode::new("Parameter").with_str("name", "x");
    let two = SyntaxNode::new("Constant").with_int("value", 2).with_str("type", "i64");
    let seven = SyntaxNode::new("Constant").with_int("value", 7).with_str("type", "i64");
    let five = SyntaxNode::new("Constant").with_int("value", 5).with_str("type", "i64");
    let mul = SyntaxNode::new("Multiply").with_node("left", x).with_node("right", two);
    let add = SyntaxNode::new("Add").with_node("left", mul).with_node("right", seven);
    SyntaxNode::new("Modulo").with_node("left", add).with_node("right", five)
}

fn bench_arithmetic(c: &mut Criterion) {
    let engine = Engine::new();
    let sig = Signature::new().param("x", primitives::I64);
    let compiled = engine.compile(&arithmetic_tree(), &sig).expect("bind");

    c.bench_function("eval_arithmetic", |b| {
        b.iter(|| {
            let out = compiled.evaluate(black_box(&[Value::I64(12345)])).expect("eval");
            black_box(out)
        })
    });
}

fn bench_bind_and_compile(c: &mut Criterion) {
    let engine = Engine::new();
    let sig = Signature::new().param("x", primitives::I64);
    let tree = arithmetic_tree();

    c.bench_function("bind_and_compile", |b| {
        b.iter(|| {
            let compiled = engine.compile(black_box(&tree), &sig).expect("bind");
            black_box(compiled.param_count())
        })
    });
}

criterion_group!(benches, bench_arithmetic, bench_bind_and_compile);
criterion_main!(benches);
