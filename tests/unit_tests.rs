//! End-to-end tests: register a universe, bind trees, evaluate.
//!
//! These exercise the full pipeline the way an embedding host does, and
//! pin down the observable contracts: deterministic binding, idempotent
//! caching, promotion and null semantics, overload selection, and failure
//! fidelity at evaluation time.

use std::sync::{Arc, RwLock};

use exprbind::prelude::*;
use rust_decimal::Decimal;

/// Initialize tracing for a test run; safe to call repeatedly.
fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Test universe
// =============================================================================

#[derive(Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

struct Link {
    value: i32,
    next: Option<Value>,
}

struct Bag {
    items: RwLock<Vec<(String, i32)>>,
}

fn point_hash() -> TypeHash {
    TypeHash::from_name("Point")
}

fn point_value(x: f64, y: f64) -> Value {
    Value::obj(point_hash(), Point { x, y })
}

fn get_point(v: &Value) -> Result<Point, NativeError> {
    v.downcast::<Point>()
        .copied()
        .ok_or_else(|| NativeError::msg("expected a Point"))
}

fn build_universe() -> Arc<TypeUniverse> {
    let universe = Arc::new(TypeUniverse::new());

    universe
        .register(
            EnumBuilder::new("Color", NumericRank::I32)
                .value("Red", 0)
                .value("Green", 1)
                .value("Blue", 2)
                .build(),
        )
        .expect("register Color");

    let point = ClassBuilder::new("Point")
        .ctor(
            &[("x", primitives::F64), ("y", primitives::F64)],
            |args| match (&args[0], &args[1]) {
                (Value::F64(x), Value::F64(y)) => Ok(point_value(*x, *y)),
                _ => Err(NativeError::msg("expected two f64s")),
            },
        )
        .field("x", primitives::F64, |recv| Ok(Value::F64(get_point(recv)?.x)))
        .field("y", primitives::F64, |recv| Ok(Value::F64(get_point(recv)?.y)))
        .property("length", primitives::F64, |recv| {
            let p = get_point(recv)?;
            Ok(Value::F64(p.x.hypot(p.y)))
        })
        .method("scale", &[("k", primitives::F64)], point_hash(), |recv, args| {
            let p = get_point(recv)?;
            let Value::F64(k) = &args[0] else {
                return Err(NativeError::msg("k must be f64"));
            };
            Ok(point_value(p.x * k, p.y * k))
        })
        .static_method("pick", &[("x", primitives::I32)], primitives::STRING, |_| {
            Ok(Value::str("i32"))
        })
        .static_method("pick", &[("x", primitives::I64)], primitives::STRING, |_| {
            Ok(Value::str("i64"))
        })
        .operator(BinaryOp::Add, point_hash(), point_hash(), |args| {
            let a = get_point(&args[0])?;
            let b = get_point(&args[1])?;
            Ok(point_value(a.x + b.x, a.y + b.y))
        })
        .operator(BinaryOp::Equal, point_hash(), primitives::BOOL, |args| {
            let a = get_point(&args[0])?;
            let b = get_point(&args[1])?;
            Ok(Value::Bool(a.x == b.x && a.y == b.y))
        })
        .implicit_to(primitives::STRING, |args| {
            let p = get_point(&args[0])?;
            Ok(Value::str(format!("({}, {})", p.x, p.y)))
        })
        .explicit_to(primitives::F64, |args| {
            let p = get_point(&args[0])?;
            Ok(Value::F64(p.x.hypot(p.y)))
        })
        .build();
    universe.register(point).expect("register Point");

    let shape = ClassBuilder::new("Shape")
        .property("name", primitives::STRING, |_recv| Ok(Value::str("shape")))
        .build();
    let shape_hash = shape.hash;
    universe.register(shape).expect("register Shape");
    universe
        .register(
            ClassBuilder::new("Circle")
                .base(shape_hash)
                .ctor(&[], |_| Ok(Value::obj(TypeHash::from_name("Circle"), ())))
                .method("area", &[("r", primitives::F64)], primitives::F64, |_recv, args| {
                    let Value::F64(r) = &args[0] else {
                        return Err(NativeError::msg("r must be f64"));
                    };
                    Ok(Value::F64(std::f64::consts::PI * r * r))
                })
                .build(),
        )
        .expect("register Circle");
    universe
        .register(
            ClassBuilder::new("Canvas")
                .static_method("describe", &[("s", shape_hash)], primitives::STRING, |args| {
                    if args[0].is_null() {
                        return Err(NativeError::msg("shape is null"));
                    }
                    Ok(Value::str("a shape"))
                })
                .build(),
        )
        .expect("register Canvas");

    universe
        .register(
            ClassBuilder::new("Link")
                .field("value", primitives::I32, |recv| {
                    recv.downcast::<Link>()
                        .map(|l| Value::I32(l.value))
                        .ok_or_else(|| NativeError::msg("expected a Link"))
                })
                .field("next", TypeHash::from_name("Link"), |recv| {
                    let link = recv
                        .downcast::<Link>()
                        .ok_or_else(|| NativeError::msg("expected a Link"))?;
                    Ok(link.next.clone().unwrap_or(Value::Null))
                })
                .build(),
        )
        .expect("register Link");

    universe
        .register(
            ClassBuilder::new("Bag")
                .ctor(&[], |_| {
                    Ok(Value::obj(
                        TypeHash::from_name("Bag"),
                        Bag {
                            items: RwLock::new(Vec::new()),
                        },
                    ))
                })
                .indexer(&[("key", primitives::STRING)], primitives::I32, |recv, args| {
                    let bag = recv
                        .downcast::<Bag>()
                        .ok_or_else(|| NativeError::msg("expected a Bag"))?;
                    let Value::Str(key) = &args[0] else {
                        return Err(NativeError::msg("key must be a string"));
                    };
                    let items = bag.items.read().expect("lock");
                    items
                        .iter()
                        .find(|(k, _)| k.as_str() == &**key)
                        .map(|(_, v)| Value::I32(*v))
                        .ok_or_else(|| NativeError::msg(format!("no entry '{key}'")))
                })
                .method(
                    "set",
                    &[("key", primitives::STRING), ("value", primitives::I32)],
                    primitives::I32,
                    |recv, args| {
                        let bag = recv
                            .downcast::<Bag>()
                            .ok_or_else(|| NativeError::msg("expected a Bag"))?;
                        let (Value::Str(key), Value::I32(v)) = (&args[0], &args[1]) else {
                            return Err(NativeError::msg("expected (string, i32)"));
                        };
                        bag.items.write().expect("lock").push((key.to_string(), *v));
                        Ok(Value::I32(*v))
                    },
                )
                .build(),
        )
        .expect("register Bag");

    universe
}

// =============================================================================
// Tree-building helpers
// =============================================================================

fn int(v: i64) -> SyntaxNode {
    SyntaxNode::new("Constant").with_int("value", v)
}

fn typed(v: i64, ty: &str) -> SyntaxNode {
    SyntaxNode::new("Constant").with_int("value", v).with_str("type", ty)
}

fn float(v: f64) -> SyntaxNode {
    SyntaxNode::new("Constant").with("value", AttrValue::Float(v))
}

fn text(s: &str) -> SyntaxNode {
    SyntaxNode::new("Constant").with_str("value", s)
}

fn null() -> SyntaxNode {
    SyntaxNode::new("Constant").with("value", AttrValue::Null)
}

fn binary(kind: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    SyntaxNode::new(kind)
        .with_node("left", left)
        .with_node("right", right)
}

fn param(name: &str) -> SyntaxNode {
    SyntaxNode::new("Parameter").with_str("name", name)
}

fn eval(engine: &Engine, tree: SyntaxNode) -> Value {
    eval_args(engine, tree, &Signature::new(), &[])
}

fn eval_args(engine: &Engine, tree: SyntaxNode, sig: &Signature, args: &[Value]) -> Value {
    engine
        .compile(&tree, sig)
        .expect("expression should bind")
        .evaluate(args)
        .expect("expression should evaluate")
}

// =============================================================================
// Determinism and caching
// =============================================================================

#[test]
fn binding_the_same_tree_twice_is_identical() {
    init_test_logging();
    let universe = build_universe();
    let tree = binary(
        "Add",
        binary("Multiply", int(6), typed(7, "i64")),
        typed(0, "i64"),
    );
    let arena_a = bumpalo::Bump::new();
    let arena_b = bumpalo::Bump::new();
    let sig = Signature::new();
    let a = exprbind::binder::bind(&universe, &arena_a, &tree, &sig).unwrap();
    let b = exprbind::binder::bind(&universe, &arena_b, &tree, &sig).unwrap();
    assert_eq!(format!("{:?}", a.root), format!("{:?}", b.root));
    assert_eq!(a.consts, b.consts);
    assert_eq!(a.members.len(), b.members.len());
}

#[test]
fn describing_a_type_twice_returns_the_same_instance() {
    let universe = build_universe();
    let first = universe.describe(point_hash()).unwrap();
    let second = universe.describe(point_hash()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn conversion_cache_does_not_grow_on_reuse() {
    let universe = build_universe();
    let before = universe.conversions().len();
    // Binding uses the caches read-only.
    let engine = Engine::with_universe(universe.clone());
    let _ = eval(&engine, binary("Add", int(1), int(2)));
    assert_eq!(universe.conversions().len(), before);
}

// =============================================================================
// Promotion correctness
// =============================================================================

#[test]
fn int_plus_long_is_a_long_addition() {
    let engine = Engine::with_universe(build_universe());
    assert_eq!(eval(&engine, binary("Add", int(2), typed(3, "i64"))), Value::I64(5));
}

#[test]
fn byte_plus_byte_is_an_int_addition() {
    let engine = Engine::with_universe(build_universe());
    assert_eq!(
        eval(&engine, binary("Add", typed(1, "u8"), typed(2, "u8"))),
        Value::I32(3)
    );
}

#[test]
fn one_plus_string_is_concatenation() {
    let engine = Engine::with_universe(build_universe());
    assert_eq!(eval(&engine, binary("Add", int(1), text("x"))), Value::str("1x"));
}

#[test]
fn enum_plus_one_rewraps_as_the_enum() {
    let engine = Engine::with_universe(build_universe());
    let green = SyntaxNode::new("PropertyOrField")
        .with_str("targetType", "Color")
        .with_str("member", "Green");
    let out = eval(&engine, binary("Add", green, int(1)));
    let color = engine.universe().resolve_name("Color").unwrap();
    assert_eq!(out, Value::Enum { ty: color, raw: 2 });
}

#[test]
fn decimal_arithmetic_is_exact() {
    let engine = Engine::with_universe(build_universe());
    let dec = |s: &str| {
        SyntaxNode::new("Constant")
            .with_str("value", s)
            .with_str("type", "decimal")
    };
    let sum = binary("Add", dec("0.1"), dec("0.2"));
    assert_eq!(
        eval(&engine, sum),
        Value::Decimal("0.3".parse::<Decimal>().unwrap())
    );
    let err = engine.compile(&binary("Add", dec("0.1"), float(0.2)), &Signature::new());
    assert!(matches!(err, Err(BindError::NumericPromotion { .. })));
}

#[test]
fn power_runs_on_floating_point() {
    let engine = Engine::with_universe(build_universe());
    assert_eq!(eval(&engine, binary("Power", int(2), int(10))), Value::F64(1024.0));
}

// =============================================================================
// Null semantics
// =============================================================================

#[test]
fn nullable_null_equals_nullable_null() {
    let engine = Engine::with_universe(build_universe());
    let null_int = || {
        SyntaxNode::new("Convert")
            .with_node("expression", null())
            .with_str("typeName", "i32?")
    };
    assert_eq!(
        eval(&engine, binary("Equal", null_int(), null_int())),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&engine, binary("LessThan", null_int(), int(1))),
        Value::Bool(false)
    );
}

#[test]
fn null_conditional_chain_short_circuits() {
    let engine = Engine::with_universe(build_universe());
    let universe = engine.universe();
    let link_ty = universe.resolve_name("Link").unwrap();
    let sig = Signature::new().param("a", link_ty);

    // a?.next.value
    let tree = SyntaxNode::new("PropertyOrField")
        .with_node(
            "expression",
            SyntaxNode::new("PropertyOrField")
                .with_node("expression", param("a"))
                .with_str("member", "next")
                .with_bool("nullConditional", true),
        )
        .with_str("member", "value");

    let compiled = engine.compile(&tree, &sig).unwrap();
    // Null target: the chain yields the nullable default without ever
    // dereferencing `next`.
    assert_eq!(compiled.evaluate(&[Value::Null]).unwrap(), Value::Null);

    let tail = Value::obj(link_ty, Link { value: 7, next: None });
    let head = Value::obj(link_ty, Link { value: 1, next: Some(tail) });
    assert_eq!(compiled.evaluate(&[head]).unwrap(), Value::I32(7));
}

#[test]
fn coalesce_and_condition_evaluate_one_branch() {
    let engine = Engine::with_universe(build_universe());
    let null_int = SyntaxNode::new("Convert")
        .with_node("expression", null())
        .with_str("typeName", "i32?");
    assert_eq!(
        eval(
            &engine,
            SyntaxNode::new("Coalesce").with_node("left", null_int).with_node("right", int(9))
        ),
        Value::I32(9)
    );
    // The untaken branch would divide by zero.
    let guarded = SyntaxNode::new("Condition")
        .with_node("test", SyntaxNode::new("Constant").with_bool("value", false))
        .with_node("ifTrue", binary("Divide", int(1), int(0)))
        .with_node("ifFalse", int(3));
    assert_eq!(eval(&engine, guarded), Value::I32(3));
    // Short-circuit AndAlso never reaches the failing right side.
    let and = SyntaxNode::new("AndAlso")
        .with_node("left", SyntaxNode::new("Constant").with_bool("value", false))
        .with_node(
            "right",
            binary("Equal", binary("Divide", int(1), int(0)), int(1)),
        );
    assert_eq!(eval(&engine, and), Value::Bool(false));
}

// =============================================================================
// Overload selection and members
// =============================================================================

#[test]
fn exact_overload_beats_widening() {
    let engine = Engine::with_universe(build_universe());
    let call = |arg: SyntaxNode| {
        SyntaxNode::new("Call")
            .with_str("targetType", "Point")
            .with_str("method", "pick")
            .with_nodes("arguments", vec![arg])
    };
    assert_eq!(eval(&engine, call(int(1))), Value::str("i32"));
    assert_eq!(eval(&engine, call(typed(1, "i64"))), Value::str("i64"));
}

#[test]
fn instance_members_and_methods_resolve() {
    let engine = Engine::with_universe(build_universe());
    let new_point = SyntaxNode::new("New")
        .with_str("typeName", "Point")
        .with_nodes("arguments", vec![float(3.0), float(4.0)]);
    let length = SyntaxNode::new("PropertyOrField")
        .with_node("expression", new_point.clone())
        .with_str("member", "length");
    assert_eq!(eval(&engine, length), Value::F64(5.0));

    let scaled_x = SyntaxNode::new("PropertyOrField")
        .with_node(
            "expression",
            SyntaxNode::new("Call")
                .with_node("expression", new_point)
                .with_str("method", "scale")
                .with_nodes("arguments", vec![float(2.0)]),
        )
        .with_str("member", "x");
    assert_eq!(eval(&engine, scaled_x), Value::F64(6.0));
}

#[test]
fn constructor_arguments_coerce() {
    let engine = Engine::with_universe(build_universe());
    // i32 arguments widen to the f64 constructor parameters.
    let tree = SyntaxNode::new("PropertyOrField")
        .with_node(
            "expression",
            SyntaxNode::new("New")
                .with_str("typeName", "Point")
                .with_nodes("arguments", vec![int(3), int(4)]),
        )
        .with_str("member", "length");
    assert_eq!(eval(&engine, tree), Value::F64(5.0));
}

#[test]
fn user_operator_overload_applies() {
    let engine = Engine::with_universe(build_universe());
    let p = |x: f64, y: f64| {
        SyntaxNode::new("New")
            .with_str("typeName", "Point")
            .with_nodes("arguments", vec![float(x), float(y)])
    };
    let sum_x = SyntaxNode::new("PropertyOrField")
        .with_node("expression", binary("Add", p(1.0, 2.0), p(3.0, 4.0)))
        .with_str("member", "x");
    assert_eq!(eval(&engine, sum_x), Value::F64(4.0));
    assert_eq!(
        eval(&engine, binary("Equal", p(1.0, 2.0), p(1.0, 2.0))),
        Value::Bool(true)
    );
}

#[test]
fn indexer_resolves_through_overload_scoring() {
    let universe = build_universe();
    let engine = Engine::with_universe(universe.clone());
    let bag_ty = universe.resolve_name("Bag").unwrap();
    let sig = Signature::new().param("b", bag_ty);
    let tree = SyntaxNode::new("Index")
        .with_node("expression", param("b"))
        .with_nodes("arguments", vec![text("answer")]);
    let bag = Value::obj(
        bag_ty,
        Bag {
            items: RwLock::new(vec![("answer".to_owned(), 42)]),
        },
    );
    assert_eq!(eval_args(&engine, tree, &sig, &[bag]), Value::I32(42));

    let set = SyntaxNode::new("Call")
        .with_node("expression", SyntaxNode::new("New").with_str("typeName", "Bag"))
        .with_str("method", "set")
        .with_nodes("arguments", vec![text("answer"), int(42)]);
    assert_eq!(eval(&engine, set), Value::I32(42));
}

#[test]
fn member_resolver_capability_finds_known_members() {
    let universe = build_universe();
    let found = universe.find_member(point_hash(), "scale", 1);
    assert!(found.is_some());
    assert!(universe.find_member(point_hash(), "scale", 3).is_none());
    assert!(universe.find_member(point_hash(), "missing", 0).is_none());
}

// =============================================================================
// Conversions and type tests
// =============================================================================

#[test]
fn implicit_operator_converts_in_argument_position() {
    let engine = Engine::with_universe(build_universe());
    // Point concatenates with a string through its implicit operator? No —
    // concat formats directly. Pass a Point where a string parameter is
    // declared instead.
    let sig = Signature::new().param("p", point_hash()).returning(primitives::STRING);
    let tree = param("p");
    let out = eval_args(&engine, tree, &sig, &[point_value(1.0, 2.0)]);
    assert_eq!(out, Value::str("(1, 2)"));
}

#[test]
fn explicit_operator_requires_a_cast_node() {
    let engine = Engine::with_universe(build_universe());
    let sig = Signature::new().param("p", point_hash());
    let cast = SyntaxNode::new("Convert")
        .with_node("expression", param("p"))
        .with_str("typeName", "f64");
    let out = eval_args(&engine, cast, &sig, &[point_value(3.0, 4.0)]);
    assert_eq!(out, Value::F64(5.0));

    // Without the cast, the same coercion is rejected at bind time.
    let sig_implicit = Signature::new().param("p", point_hash()).returning(primitives::F64);
    let err = engine.compile(&param("p"), &sig_implicit);
    assert!(matches!(err, Err(BindError::TypeMismatch { .. })));
}

#[test]
fn natural_conversion_and_type_tests() {
    let engine = Engine::with_universe(build_universe());
    let circle = SyntaxNode::new("New").with_str("typeName", "Circle");
    // Circle is accepted where Shape is declared (natural conversion).
    let described = SyntaxNode::new("Call")
        .with_str("targetType", "Canvas")
        .with_str("method", "describe")
        .with_nodes("arguments", vec![circle.clone()]);
    assert_eq!(eval(&engine, described), Value::str("a shape"));

    let is_shape = SyntaxNode::new("TypeIs")
        .with_node("expression", circle.clone())
        .with_str("typeName", "Shape");
    assert_eq!(eval(&engine, is_shape), Value::Bool(true));

    let as_shape_name = SyntaxNode::new("TypeAs")
        .with_node("expression", circle)
        .with_str("typeName", "Shape");
    // TypeAs keeps the value; a mismatch yields null instead of throwing.
    let as_missing = SyntaxNode::new("TypeAs")
        .with_node("expression", SyntaxNode::new("New").with_str("typeName", "Bag"))
        .with_str("typeName", "Shape");
    assert!(matches!(eval(&engine, as_shape_name), Value::Obj { .. }));
    assert_eq!(eval(&engine, as_missing), Value::Null);
}

#[test]
fn unboxing_failures_surface_at_evaluation_only() {
    let engine = Engine::with_universe(build_universe());
    let sig = Signature::new().param("o", primitives::OBJECT);
    let unbox = SyntaxNode::new("Convert")
        .with_node("expression", param("o"))
        .with_str("typeName", "i32");
    let compiled = engine.compile(&unbox, &sig).expect("unboxing binds");
    assert!(matches!(
        compiled.evaluate(&[Value::Null]),
        Err(EvalError::NullDereference { .. })
    ));
    assert!(matches!(
        compiled.evaluate(&[Value::F64(1.0)]),
        Err(EvalError::InvalidCast { .. })
    ));
    assert_eq!(compiled.evaluate(&[Value::I32(5)]).unwrap(), Value::I32(5));
}

#[test]
fn typeof_default_and_array_length() {
    let engine = Engine::with_universe(build_universe());
    let color = engine.universe().resolve_name("Color").unwrap();
    assert_eq!(
        eval(&engine, SyntaxNode::new("TypeOf").with_str("typeName", "Color")),
        Value::Type(color)
    );
    assert_eq!(
        eval(&engine, SyntaxNode::new("Default").with_str("typeName", "i64")),
        Value::I64(0)
    );
    assert_eq!(
        eval(&engine, SyntaxNode::new("Default").with_str("typeName", "string")),
        Value::Null
    );
    let arr = SyntaxNode::new("NewArrayInit")
        .with_str("typeName", "i32")
        .with_nodes("initializers", vec![int(1), int(2), int(3)]);
    assert_eq!(
        eval(&engine, SyntaxNode::new("ArrayLength").with_node("expression", arr)),
        Value::I32(3)
    );
}

// =============================================================================
// Failure fidelity
// =============================================================================

#[test]
fn divide_by_zero_raises_at_evaluation() {
    let engine = Engine::with_universe(build_universe());
    let compiled = engine
        .compile(&binary("Divide", int(1), int(0)), &Signature::new())
        .expect("binds fine");
    assert!(matches!(compiled.evaluate(&[]), Err(EvalError::DivideByZero)));
}

#[test]
fn wrong_argument_count_is_reported() {
    let engine = Engine::with_universe(build_universe());
    let sig = Signature::new().param("x", primitives::I32);
    let compiled = engine.compile(&param("x"), &sig).unwrap();
    assert!(matches!(
        compiled.evaluate(&[]),
        Err(EvalError::ArgumentCount { expected: 1, got: 0 })
    ));
}

#[test]
fn no_overload_error_reports_after_trying_all_candidates() {
    let engine = Engine::with_universe(build_universe());
    let call = SyntaxNode::new("Call")
        .with_str("targetType", "Point")
        .with_str("method", "pick")
        .with_nodes("arguments", vec![text("not a number")]);
    match engine.compile(&call, &Signature::new()) {
        Err(BindError::NoMatchingOverload { name, .. }) => assert_eq!(name, "pick"),
        Err(other) => panic!("expected NoMatchingOverload, got {other:?}"),
        Ok(_) => panic!("expected NoMatchingOverload, but the call bound"),
    }
}
