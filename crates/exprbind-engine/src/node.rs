//! The immutable execution-node tree.
//!
//! One [`ExecNode`] per bound-graph node, with every member handle, slot
//! index, and conversion operator resolved at compile time — `run` performs
//! no name lookups. Nodes are `Send + Sync` and may be evaluated
//! concurrently, each call against its own [`Frame`].

use std::any::Any;
use std::sync::Arc;

use exprbind_core::{
    ArrayValue, BinaryOp, EvalError, NativeFn, NumericRank, TypeHash, UnaryOp, Value,
};
use exprbind_registry::TypeUniverse;

use crate::frame::Frame;
use crate::ops;

/// The compiled body of a lambda plus the frame slots of its parameters.
pub struct LambdaPayload {
    pub(crate) slots: Box<[usize]>,
    pub(crate) body: ExecNode,
}

/// How a compiled binary operation executes.
pub enum ExecBinaryMode {
    Numeric { rank: NumericRank, lifted: bool },
    EnumArith {
        enum_ty: TypeHash,
        rank: NumericRank,
        lifted: bool,
    },
    Bool,
    Concat,
    Equality,
    Operator { f: NativeFn },
}

/// How a compiled unary operation executes.
pub enum ExecUnaryMode {
    Numeric { rank: NumericRank, lifted: bool },
    EnumComplement { enum_ty: TypeHash, rank: NumericRank },
    Bool,
}

/// A compiled conversion step.
pub enum ExecConversion {
    Identity,
    Numeric { to: NumericRank },
    EnumToUnderlying { to: NumericRank },
    UnderlyingToEnum { enum_ty: TypeHash },
    NullableUnwrap,
    Unbox {
        target: TypeHash,
        target_name: Box<str>,
        universe: Arc<TypeUniverse>,
    },
    Operator { f: NativeFn },
}

/// One immutable, pre-resolved execution node.
pub enum ExecNode {
    Constant { slot: usize },
    Parameter { slot: usize },
    Field {
        target: Option<Box<ExecNode>>,
        getter: NativeFn,
        member: Box<str>,
    },
    Call {
        target: Option<Box<ExecNode>>,
        invoke: NativeFn,
        args: Box<[ExecNode]>,
        member: Box<str>,
    },
    Indexer {
        target: Box<ExecNode>,
        invoke: NativeFn,
        args: Box<[ExecNode]>,
    },
    ArrayIndex {
        target: Box<ExecNode>,
        indices: Box<[ExecNode]>,
    },
    Ctor {
        invoke: NativeFn,
        args: Box<[ExecNode]>,
    },
    Binary {
        op: BinaryOp,
        mode: ExecBinaryMode,
        lhs: Box<ExecNode>,
        rhs: Box<ExecNode>,
    },
    Unary {
        op: UnaryOp,
        mode: ExecUnaryMode,
        operand: Box<ExecNode>,
    },
    Logical {
        and: bool,
        lhs: Box<ExecNode>,
        rhs: Box<ExecNode>,
    },
    Coalesce {
        lhs: Box<ExecNode>,
        rhs: Box<ExecNode>,
    },
    Condition {
        test: Box<ExecNode>,
        if_true: Box<ExecNode>,
        if_false: Box<ExecNode>,
    },
    Convert {
        input: Box<ExecNode>,
        kind: ExecConversion,
        checked: bool,
    },
    TypeIs {
        input: Box<ExecNode>,
        target: TypeHash,
        universe: Arc<TypeUniverse>,
    },
    TypeAs {
        input: Box<ExecNode>,
        target: TypeHash,
        universe: Arc<TypeUniverse>,
    },
    ArrayLength { input: Box<ExecNode> },
    NewArrayBounds {
        elem: TypeHash,
        bounds: Box<[ExecNode]>,
        fill: Value,
    },
    NewArrayInit {
        elem: TypeHash,
        items: Box<[ExecNode]>,
    },
    MemberInit {
        ctor: Box<ExecNode>,
        bindings: Box<[(NativeFn, ExecNode)]>,
    },
    ListInit {
        ctor: Box<ExecNode>,
        adds: Box<[(NativeFn, Box<[ExecNode]>)]>,
    },
    Lambda {
        ty: TypeHash,
        payload: Arc<LambdaPayload>,
    },
    Invoke {
        target: Box<ExecNode>,
        args: Box<[ExecNode]>,
    },
    Quote {
        ty: TypeHash,
        payload: Arc<LambdaPayload>,
    },
    NullGuard {
        targets: Box<[ExecNode]>,
        body: Box<ExecNode>,
    },
}

impl ExecNode {
    /// Evaluate this node against a frame.
    pub fn run(&self, frame: &mut Frame) -> Result<Value, EvalError> {
        match self {
            ExecNode::Constant { slot } => Ok(frame.constant(*slot)),
            ExecNode::Parameter { slot } => Ok(frame.local(*slot)),

            ExecNode::Field { target, getter, member } => {
                let receiver = eval_receiver(target.as_deref(), frame, member)?;
                Ok(getter.call(receiver.as_ref(), &[])?)
            }

            ExecNode::Call { target, invoke, args, member } => {
                let receiver = eval_receiver(target.as_deref(), frame, member)?;
                let args = eval_args(args, frame)?;
                Ok(invoke.call(receiver.as_ref(), &args)?)
            }

            ExecNode::Indexer { target, invoke, args } => {
                let receiver = target.run(frame)?;
                if receiver.is_null() {
                    return Err(EvalError::NullDereference {
                        what: "indexer target".into(),
                    });
                }
                let args = eval_args(args, frame)?;
                Ok(invoke.call(Some(&receiver), &args)?)
            }

            ExecNode::ArrayIndex { target, indices } => {
                let array = target.run(frame)?;
                let Value::Array(array) = &array else {
                    if array.is_null() {
                        return Err(EvalError::NullDereference {
                            what: "array access".into(),
                        });
                    }
                    return Err(unexpected("array access", "an array", &array));
                };
                let mut idx = Vec::with_capacity(indices.len());
                for index in indices {
                    let v = index.run(frame)?;
                    idx.push(v.to_i128().ok_or_else(|| unexpected(
                        "array index",
                        "an integer",
                        &v,
                    ))? as i64);
                }
                let offset = array
                    .offset_of(&idx)
                    .map_err(|(index, len)| EvalError::IndexOutOfRange { index, len })?;
                Ok(array.items[offset].clone())
            }

            ExecNode::Ctor { invoke, args } => {
                let args = eval_args(args, frame)?;
                Ok(invoke.call(None, &args)?)
            }

            ExecNode::Binary { op, mode, lhs, rhs } => run_binary(*op, mode, lhs, rhs, frame),
            ExecNode::Unary { op, mode, operand } => run_unary(*op, mode, operand, frame),

            ExecNode::Logical { and, lhs, rhs } => {
                let left = as_bool(lhs.run(frame)?, "logical operand")?;
                // Exactly one branch evaluates beyond the short circuit.
                if *and {
                    if !left {
                        return Ok(Value::Bool(false));
                    }
                } else if left {
                    return Ok(Value::Bool(true));
                }
                let right = as_bool(rhs.run(frame)?, "logical operand")?;
                Ok(Value::Bool(right))
            }

            ExecNode::Coalesce { lhs, rhs } => {
                let left = lhs.run(frame)?;
                if left.is_null() {
                    rhs.run(frame)
                } else {
                    Ok(left)
                }
            }

            ExecNode::Condition { test, if_true, if_false } => {
                if as_bool(test.run(frame)?, "condition test")? {
                    if_true.run(frame)
                } else {
                    if_false.run(frame)
                }
            }

            ExecNode::Convert { input, kind, checked } => {
                let value = input.run(frame)?;
                run_convert(kind, *checked, value)
            }

            ExecNode::TypeIs { input, target, universe } => {
                let value = input.run(frame)?;
                if value.is_null() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(universe.is_assignable(value.type_of(), *target)))
            }

            ExecNode::TypeAs { input, target, universe } => {
                let value = input.run(frame)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                if universe.is_assignable(value.type_of(), *target) {
                    Ok(value)
                } else {
                    Ok(Value::Null)
                }
            }

            ExecNode::ArrayLength { input } => {
                let value = input.run(frame)?;
                match &value {
                    Value::Array(array) => Ok(Value::I32(array.len() as i32)),
                    v if v.is_null() => Err(EvalError::NullDereference {
                        what: "array length".into(),
                    }),
                    v => Err(unexpected("array length", "an array", v)),
                }
            }

            ExecNode::NewArrayBounds { elem, bounds, fill } => {
                let mut dims = Vec::with_capacity(bounds.len());
                for bound in bounds {
                    let v = bound.run(frame)?;
                    let len = v.to_i128().ok_or_else(|| unexpected(
                        "array bound",
                        "an integer",
                        &v,
                    ))?;
                    if len < 0 {
                        return Err(EvalError::IndexOutOfRange {
                            index: len as i64,
                            len: 0,
                        });
                    }
                    dims.push(len as usize);
                }
                let total: usize = dims.iter().product();
                Ok(Value::Array(Arc::new(ArrayValue {
                    elem: *elem,
                    dims,
                    items: vec![fill.clone(); total],
                })))
            }

            ExecNode::NewArrayInit { elem, items } => {
                let values = eval_args(items, frame)?;
                Ok(Value::Array(Arc::new(ArrayValue {
                    elem: *elem,
                    dims: vec![values.len()],
                    items: values,
                })))
            }

            ExecNode::MemberInit { ctor, bindings } => {
                let instance = ctor.run(frame)?;
                // Thread the fresh instance through the scratch slots so
                // nested initializer sub-trees see it.
                let outer = std::mem::replace(&mut frame.locals[0], instance);
                let outer2 = std::mem::replace(&mut frame.locals[1], outer);
                let result = run_bindings(bindings, frame);
                let prev = std::mem::replace(&mut frame.locals[1], outer2);
                let instance = std::mem::replace(&mut frame.locals[0], prev);
                result?;
                Ok(instance)
            }

            ExecNode::ListInit { ctor, adds } => {
                let instance = ctor.run(frame)?;
                let outer = std::mem::replace(&mut frame.locals[0], instance);
                let outer2 = std::mem::replace(&mut frame.locals[1], outer);
                let result = run_adds(adds, frame);
                let prev = std::mem::replace(&mut frame.locals[1], outer2);
                let instance = std::mem::replace(&mut frame.locals[0], prev);
                result?;
                Ok(instance)
            }

            ExecNode::Lambda { ty, payload } => Ok(Value::Lambda {
                ty: *ty,
                payload: as_any(payload),
            }),

            ExecNode::Quote { ty, payload } => Ok(Value::Quoted {
                ty: *ty,
                payload: as_any(payload),
            }),

            ExecNode::Invoke { target, args } => {
                let callee = target.run(frame)?;
                let payload = match &callee {
                    Value::Lambda { payload, .. } => payload.clone(),
                    v if v.is_null() => {
                        return Err(EvalError::NullDereference {
                            what: "lambda invocation".into(),
                        });
                    }
                    v => return Err(unexpected("lambda invocation", "a lambda", v)),
                };
                let Some(payload) = payload.downcast_ref::<LambdaPayload>() else {
                    return Err(unexpected("lambda invocation", "a lambda", &callee));
                };
                let args = eval_args(args, frame)?;
                let mut saved = Vec::with_capacity(payload.slots.len());
                for (slot, value) in payload.slots.iter().zip(args) {
                    saved.push(std::mem::replace(&mut frame.locals[*slot], value));
                }
                let result = payload.body.run(frame);
                for (slot, old) in payload.slots.iter().zip(saved) {
                    frame.locals[*slot] = old;
                }
                result
            }

            ExecNode::NullGuard { targets, body } => {
                // Conjunction in registration order: any null target
                // short-circuits the whole chain to the nullable default.
                for target in targets {
                    if target.run(frame)?.is_null() {
                        return Ok(Value::Null);
                    }
                }
                body.run(frame)
            }
        }
    }
}

fn as_any(payload: &Arc<LambdaPayload>) -> Arc<dyn Any + Send + Sync> {
    payload.clone()
}

fn eval_args(args: &[ExecNode], frame: &mut Frame) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        out.push(arg.run(frame)?);
    }
    Ok(out)
}

/// Evaluate an instance target; a null receiver raises the same error
/// hand-written member access through null would.
fn eval_receiver(
    target: Option<&ExecNode>,
    frame: &mut Frame,
    member: &str,
) -> Result<Option<Value>, EvalError> {
    match target {
        None => Ok(None),
        Some(target) => {
            let value = target.run(frame)?;
            if value.is_null() {
                return Err(EvalError::NullDereference {
                    what: format!("member '{member}'"),
                });
            }
            Ok(Some(value))
        }
    }
}

fn run_bindings(bindings: &[(NativeFn, ExecNode)], frame: &mut Frame) -> Result<(), EvalError> {
    for (setter, value) in bindings {
        let value = value.run(frame)?;
        let instance = frame.local(0);
        setter.call(Some(&instance), &[value])?;
    }
    Ok(())
}

fn run_adds(
    adds: &[(NativeFn, Box<[ExecNode]>)],
    frame: &mut Frame,
) -> Result<(), EvalError> {
    for (add, args) in adds {
        let args = eval_args(args, frame)?;
        let instance = frame.local(0);
        add.call(Some(&instance), &args)?;
    }
    Ok(())
}

fn run_binary(
    op: BinaryOp,
    mode: &ExecBinaryMode,
    lhs: &ExecNode,
    rhs: &ExecNode,
    frame: &mut Frame,
) -> Result<Value, EvalError> {
    let left = lhs.run(frame)?;
    let right = rhs.run(frame)?;
    match mode {
        ExecBinaryMode::Numeric { rank, lifted } => {
            ops::numeric_binary(op, *rank, *lifted, &left, &right)
        }
        ExecBinaryMode::EnumArith { enum_ty, rank, lifted } => {
            let raw = ops::numeric_binary(op, *rank, *lifted, &left, &right)?;
            ops::wrap_enum(raw, *enum_ty)
        }
        ExecBinaryMode::Bool => {
            let a = as_bool(left, "boolean operand")?;
            let b = as_bool(right, "boolean operand")?;
            Ok(Value::Bool(match op {
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                _ => a ^ b,
            }))
        }
        ExecBinaryMode::Concat => Ok(ops::concat(&left, &right)),
        ExecBinaryMode::Equality => {
            let equal = left == right;
            Ok(Value::Bool(if op == BinaryOp::NotEqual {
                !equal
            } else {
                equal
            }))
        }
        ExecBinaryMode::Operator { f } => Ok(f.call(None, &[left, right])?),
    }
}

fn run_unary(
    op: UnaryOp,
    mode: &ExecUnaryMode,
    operand: &ExecNode,
    frame: &mut Frame,
) -> Result<Value, EvalError> {
    let value = operand.run(frame)?;
    match mode {
        ExecUnaryMode::Numeric { rank, lifted } => ops::numeric_unary(op, *rank, *lifted, &value),
        ExecUnaryMode::EnumComplement { enum_ty, rank } => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            let raw = ops::numeric_unary(op, *rank, false, &value)?;
            ops::wrap_enum(raw, *enum_ty)
        }
        ExecUnaryMode::Bool => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::Bool(!as_bool(value, "boolean operand")?))
        }
    }
}

fn run_convert(kind: &ExecConversion, checked: bool, value: Value) -> Result<Value, EvalError> {
    match kind {
        ExecConversion::Identity => Ok(value),
        ExecConversion::NullableUnwrap => {
            if value.is_null() {
                Err(EvalError::NullDereference {
                    what: "nullable unwrap".into(),
                })
            } else {
                Ok(value)
            }
        }
        ExecConversion::Numeric { to } => {
            // Nulls flow through lifted conversions untouched.
            if value.is_null() {
                return Ok(Value::Null);
            }
            if value.numeric_rank().is_none() && !matches!(value, Value::Enum { .. }) {
                return Err(unexpected("numeric conversion", "a numeric value", &value));
            }
            value.cast_numeric(*to, checked).ok_or_else(|| EvalError::Overflow {
                op: format!("conversion to {}", to.canonical_name()),
            })
        }
        ExecConversion::EnumToUnderlying { to } => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            value.cast_numeric(*to, checked).ok_or_else(|| EvalError::Overflow {
                op: format!("enum conversion to {}", to.canonical_name()),
            })
        }
        ExecConversion::UnderlyingToEnum { enum_ty } => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            ops::wrap_enum(value, *enum_ty)
        }
        ExecConversion::Unbox { target, target_name, universe } => {
            if value.is_null() {
                let accepts_null = universe
                    .try_describe(*target)
                    .map(|d| d.accepts_null())
                    .unwrap_or(false);
                if accepts_null {
                    return Ok(Value::Null);
                }
                return Err(EvalError::NullDereference {
                    what: format!("unboxing to '{target_name}'"),
                });
            }
            let runtime = value.type_of();
            if runtime == *target || universe.is_assignable(runtime, *target) {
                Ok(value)
            } else {
                Err(EvalError::InvalidCast {
                    from: universe.name_of(runtime),
                    to: target_name.to_string(),
                })
            }
        }
        ExecConversion::Operator { f } => Ok(f.call(None, &[value])?),
    }
}

fn as_bool(value: Value, what: &str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(unexpected(what, "a bool", &other)),
    }
}

fn unexpected(what: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::UnexpectedValue {
        what: what.into(),
        expected: expected.into(),
        got: got.kind_name().into(),
    }
}
