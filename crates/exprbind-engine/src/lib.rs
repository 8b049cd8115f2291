//! Execution engine: bound graph in, reusable evaluator out.
//!
//! [`compile`] lowers a [`BoundProgram`](exprbind_binder::BoundProgram)
//! into an immutable tree of execution nodes with every member handle and
//! slot index pre-resolved, so evaluation performs no name lookups and
//! generates no code. A [`CompiledExpr`] may be evaluated repeatedly and
//! concurrently; each call owns its own frame.

mod compile;
mod frame;
mod node;
mod ops;

pub use compile::{CompiledExpr, compile};
pub use frame::SCRATCH_SLOTS;
pub use node::{ExecNode, LambdaPayload};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, RwLock};

    use bumpalo::Bump;

    use exprbind_binder::{Signature, bind};
    use exprbind_core::{
        EvalError, NativeError, NumericRank, SyntaxNode, Value, primitives,
    };
    use exprbind_registry::{ClassBuilder, EnumBuilder, TypeUniverse};

    fn int(v: i64) -> SyntaxNode {
        SyntaxNode::new("Constant").with_int("value", v)
    }

    fn typed(v: i64, ty: &str) -> SyntaxNode {
        SyntaxNode::new("Constant").with_int("value", v).with_str("type", ty)
    }

    fn binary(kind: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
        SyntaxNode::new(kind)
            .with_node("left", left)
            .with_node("right", right)
    }

    fn eval_with(
        universe: &Arc<TypeUniverse>,
        node: SyntaxNode,
        sig: &Signature,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let arena = Bump::new();
        let program = bind(universe, &arena, &node, sig).expect("bind");
        compile(&program, universe).evaluate(args)
    }

    fn eval(node: SyntaxNode) -> Result<Value, EvalError> {
        let universe = Arc::new(TypeUniverse::new());
        eval_with(&universe, node, &Signature::new(), &[])
    }

    #[test]
    fn int_plus_long_evaluates_to_5_i64() {
        assert_eq!(eval(binary("Add", int(2), typed(3, "i64"))).unwrap(), Value::I64(5));
    }

    #[test]
    fn byte_plus_byte_evaluates_as_i32() {
        assert_eq!(eval(binary("Add", typed(1, "u8"), typed(2, "u8"))).unwrap(), Value::I32(3));
    }

    #[test]
    fn one_plus_string_concatenates() {
        let x = SyntaxNode::new("Constant").with_str("value", "x");
        // A typeless string constant: `with_str` writes a Str attribute.
        let node = binary("Add", int(1), x);
        assert_eq!(eval(node).unwrap(), Value::str("1x"));
    }

    #[test]
    fn condition_evaluates_exactly_one_branch() {
        // The false branch would divide by zero if evaluated.
        let node = SyntaxNode::new("Condition")
            .with_node("test", SyntaxNode::new("Constant").with_bool("value", true))
            .with_node("ifTrue", int(1))
            .with_node("ifFalse", binary("Divide", int(1), int(0)));
        assert_eq!(eval(node).unwrap(), Value::I32(1));
    }

    #[test]
    fn coalesce_takes_fallback_on_null() {
        let null_int = SyntaxNode::new("Convert")
            .with_node(
                "expression",
                SyntaxNode::new("Constant").with("value", exprbind_core::AttrValue::Null),
            )
            .with_str("typeName", "i32?");
        let node = SyntaxNode::new("Coalesce")
            .with_node("left", null_int)
            .with_node("right", int(9));
        assert_eq!(eval(node).unwrap(), Value::I32(9));
    }

    #[test]
    fn nullable_null_equality_is_true() {
        let null_int = || {
            SyntaxNode::new("Convert")
                .with_node(
                    "expression",
                    SyntaxNode::new("Constant").with("value", exprbind_core::AttrValue::Null),
                )
                .with_str("typeName", "i32?")
        };
        let node = binary("Equal", null_int(), null_int());
        assert_eq!(eval(node).unwrap(), Value::Bool(true));
    }

    #[test]
    fn checked_conversion_overflows_unchecked_wraps() {
        let narrow = |checked: bool| {
            SyntaxNode::new(if checked { "ConvertChecked" } else { "Convert" })
                .with_node("expression", typed(300, "i64"))
                .with_str("typeName", "u8")
        };
        assert!(matches!(eval(narrow(true)), Err(EvalError::Overflow { .. })));
        assert_eq!(eval(narrow(false)).unwrap(), Value::U8(44));
    }

    #[test]
    fn enum_plus_one_is_the_next_value() {
        let universe = Arc::new(TypeUniverse::new());
        universe
            .register(
                EnumBuilder::new("Color", NumericRank::I32)
                    .value("Red", 0)
                    .value("Green", 1)
                    .value("Blue", 2)
                    .build(),
            )
            .unwrap();
        let green = SyntaxNode::new("PropertyOrField")
            .with_str("targetType", "Color")
            .with_str("member", "Green");
        let out = eval_with(&universe, binary("Add", green, int(1)), &Signature::new(), &[])
            .unwrap();
        let color = universe.resolve_name("Color").unwrap();
        assert_eq!(out, Value::Enum { ty: color, raw: 2 });
    }

    struct Counter {
        count: RwLock<i32>,
    }

    fn counter_universe() -> Arc<TypeUniverse> {
        let universe = Arc::new(TypeUniverse::new());
        let counter = ClassBuilder::new("Counter")
            .ctor(&[], |_args| {
                Ok(Value::obj(
                    exprbind_core::TypeHash::from_name("Counter"),
                    Counter {
                        count: RwLock::new(0),
                    },
                ))
            })
            .field_mut(
                "count",
                primitives::I32,
                |recv| {
                    let c = recv
                        .downcast::<Counter>()
                        .ok_or_else(|| NativeError::msg("not a Counter"))?;
                    Ok(Value::I32(*c.count.read().expect("lock")))
                },
                |recv, value| {
                    let c = recv
                        .downcast::<Counter>()
                        .ok_or_else(|| NativeError::msg("not a Counter"))?;
                    let Value::I32(v) = value else {
                        return Err(NativeError::msg("count must be i32"));
                    };
                    *c.count.write().expect("lock") = *v;
                    Ok(())
                },
            )
            .method("add", &[("n", primitives::I32)], primitives::I32, |recv, args| {
                let c = recv
                    .downcast::<Counter>()
                    .ok_or_else(|| NativeError::msg("not a Counter"))?;
                let Value::I32(n) = &args[0] else {
                    return Err(NativeError::msg("n must be i32"));
                };
                let mut guard = c.count.write().expect("lock");
                *guard += *n;
                Ok(Value::I32(*guard))
            })
            .build();
        universe.register(counter).unwrap();
        universe
    }

    #[test]
    fn member_init_threads_the_instance_through_scratch_slots() {
        let universe = counter_universe();
        let node = SyntaxNode::new("MemberInit")
            .with_node("newExpression", SyntaxNode::new("New").with_str("typeName", "Counter"))
            .with_node("count", int(41));
        let instance = eval_with(&universe, node, &Signature::new(), &[]).unwrap();
        let read_back = SyntaxNode::new("PropertyOrField").with_str("member", "count");
        let counter_ty = universe.resolve_name("Counter").unwrap();
        let sig = Signature::new().with_root(counter_ty);
        let out = eval_with(&universe, read_back, &sig, &[instance]).unwrap();
        assert_eq!(out, Value::I32(41));
    }

    #[test]
    fn list_init_routes_through_add() {
        let universe = counter_universe();
        let node = SyntaxNode::new("ListInit")
            .with_node("newExpression", SyntaxNode::new("New").with_str("typeName", "Counter"))
            .with_nodes("initializers", vec![int(2), int(3)]);
        let instance = eval_with(&universe, node, &Signature::new(), &[]).unwrap();
        let sig = Signature::new().with_root(universe.resolve_name("Counter").unwrap());
        let read_back = SyntaxNode::new("PropertyOrField").with_str("member", "count");
        let out = eval_with(&universe, read_back, &sig, &[instance]).unwrap();
        assert_eq!(out, Value::I32(5));
    }

    #[test]
    fn null_propagation_short_circuits_without_dereferencing() {
        let universe = counter_universe();
        let counter_ty = universe.resolve_name("Counter").unwrap();
        let sig = Signature::new().param("c", counter_ty);
        // c?.count : null c yields null, never touching the getter.
        let node = SyntaxNode::new("PropertyOrField")
            .with_node("expression", SyntaxNode::new("Parameter").with_str("name", "c"))
            .with_str("member", "count")
            .with_bool("nullConditional", true);
        let out = eval_with(&universe, node, &sig, &[Value::Null]).unwrap();
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn plain_member_access_through_null_raises() {
        let universe = counter_universe();
        let counter_ty = universe.resolve_name("Counter").unwrap();
        let sig = Signature::new().param("c", counter_ty);
        let node = SyntaxNode::new("PropertyOrField")
            .with_node("expression", SyntaxNode::new("Parameter").with_str("name", "c"))
            .with_str("member", "count");
        let err = eval_with(&universe, node, &sig, &[Value::Null]);
        assert!(matches!(err, Err(EvalError::NullDereference { .. })));
    }

    #[test]
    fn unboxing_null_into_a_value_type_raises_at_run_time() {
        let universe = Arc::new(TypeUniverse::new());
        let sig = Signature::new().param("o", primitives::OBJECT);
        let node = SyntaxNode::new("Convert")
            .with_node("expression", SyntaxNode::new("Parameter").with_str("name", "o"))
            .with_str("typeName", "i32");
        // Binding succeeds; only evaluation raises.
        let arena = Bump::new();
        let program = bind(&universe, &arena, &node, &sig).expect("binds fine");
        let compiled = compile(&program, &universe);
        let err = compiled.evaluate(&[Value::Null]);
        assert!(matches!(err, Err(EvalError::NullDereference { .. })));
        let err = compiled.evaluate(&[Value::str("not an int")]);
        assert!(matches!(err, Err(EvalError::InvalidCast { .. })));
        assert_eq!(compiled.evaluate(&[Value::I32(7)]).unwrap(), Value::I32(7));
    }

    #[test]
    fn multi_dimensional_index_and_bounds() {
        let universe = Arc::new(TypeUniverse::new());
        let array = SyntaxNode::new("NewArrayBounds")
            .with_str("typeName", "i32")
            .with_nodes("bounds", vec![int(2), int(3)]);
        let node = SyntaxNode::new("Index")
            .with_node("expression", array.clone())
            .with_nodes("arguments", vec![int(1), int(2)]);
        assert_eq!(
            eval_with(&universe, node, &Signature::new(), &[]).unwrap(),
            Value::I32(0)
        );
        let oob = SyntaxNode::new("Index")
            .with_node("expression", array)
            .with_nodes("arguments", vec![int(2), int(0)]);
        assert!(matches!(
            eval_with(&universe, oob, &Signature::new(), &[]),
            Err(EvalError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn lambda_invocation_uses_frame_slots() {
        let node = SyntaxNode::new("Invoke")
            .with_node(
                "expression",
                SyntaxNode::new("Lambda")
                    .with_nodes(
                        "parameters",
                        vec![
                            SyntaxNode::new("Parameter")
                                .with_str("name", "x")
                                .with_str("type", "i32"),
                        ],
                    )
                    .with_node(
                        "body",
                        binary("Multiply", SyntaxNode::new("Parameter").with_str("name", "x"), int(3)),
                    ),
            )
            .with_nodes("arguments", vec![int(14)]);
        assert_eq!(eval(node).unwrap(), Value::I32(42));
    }

    #[test]
    fn compiled_expression_is_reusable_across_threads() {
        let universe = Arc::new(TypeUniverse::new());
        let sig = Signature::new().param("x", primitives::I64);
        let node = binary("Multiply", SyntaxNode::new("Parameter").with_str("name", "x"), typed(2, "i64"));
        let arena = Bump::new();
        let program = bind(&universe, &arena, &node, &sig).unwrap();
        let compiled = Arc::new(compile(&program, &universe));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let compiled = compiled.clone();
                std::thread::spawn(move || compiled.evaluate(&[Value::I64(i)]).unwrap())
            })
            .collect();
        let mut results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_by_key(|v| match v {
            Value::I64(v) => *v,
            _ => i64::MAX,
        });
        assert_eq!(
            results,
            vec![Value::I64(0), Value::I64(2), Value::I64(4), Value::I64(6)]
        );
    }
}
