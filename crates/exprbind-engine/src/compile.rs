//! Lowering from the bound graph to the execution tree.
//!
//! A single pass over the [`BoundProgram`]: every member/operator index is
//! resolved to its `NativeFn` handle, constants move into the frame's
//! constant pool, and parameter slots are offset past the two reserved
//! scratch slots. The result is immutable and reusable across calls and
//! threads.

use std::sync::Arc;

use tracing::debug;

use exprbind_core::{EvalError, Value};
use exprbind_registry::TypeUniverse;

use exprbind_binder::{
    BinaryMode, BoundExpr, BoundKind, BoundProgram, Conversion, UnaryMode,
};

use crate::frame::{Frame, SCRATCH_SLOTS};
use crate::node::{
    ExecBinaryMode, ExecConversion, ExecNode, ExecUnaryMode, LambdaPayload,
};

/// A compiled, callable evaluator.
///
/// Immutable and side-effect-free with respect to shared state; invoke
/// [`CompiledExpr::evaluate`] concurrently from as many threads as needed —
/// each call builds its own frame.
pub struct CompiledExpr {
    root: Arc<ExecNode>,
    consts: Arc<[Value]>,
    param_count: usize,
    local_count: usize,
}

impl CompiledExpr {
    /// Evaluate against one argument row (the declared parameters, root
    /// first when the signature declared one).
    pub fn evaluate(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.param_count {
            return Err(EvalError::ArgumentCount {
                expected: self.param_count,
                got: args.len(),
            });
        }
        let mut frame = Frame::new(self.consts.clone(), self.local_count);
        for (index, arg) in args.iter().enumerate() {
            frame.locals[SCRATCH_SLOTS + index] = arg.clone();
        }
        self.root.run(&mut frame)
    }

    /// Number of arguments [`CompiledExpr::evaluate`] expects.
    pub fn param_count(&self) -> usize {
        self.param_count
    }
}

/// Lower a bound program into a compiled evaluator.
///
/// The universe handle is retained only by runtime type-test nodes
/// (`TypeIs`/`TypeAs`/unboxing), which read the by-then-immutable caches.
pub fn compile(program: &BoundProgram<'_>, universe: &Arc<TypeUniverse>) -> CompiledExpr {
    let lowerer = Lowerer { program, universe };
    let root = lowerer.lower(program.root);
    debug!(
        consts = program.consts.len(),
        locals = SCRATCH_SLOTS + program.slot_count,
        "compiled expression"
    );
    CompiledExpr {
        root: Arc::new(root),
        consts: Arc::from(program.consts.clone()),
        param_count: program.param_count,
        local_count: SCRATCH_SLOTS + program.slot_count,
    }
}

struct Lowerer<'p, 'b> {
    program: &'p BoundProgram<'b>,
    universe: &'p Arc<TypeUniverse>,
}

impl<'p, 'b> Lowerer<'p, 'b> {
    fn lower(&self, expr: &BoundExpr<'b>) -> ExecNode {
        match expr.kind {
            BoundKind::Constant(id) => ExecNode::Constant { slot: id as usize },
            BoundKind::Parameter { slot } => ExecNode::Parameter {
                slot: SCRATCH_SLOTS + slot,
            },

            BoundKind::Field { target, member } => {
                let desc = &self.program.members[member as usize];
                ExecNode::Field {
                    target: target.map(|t| Box::new(self.lower(t))),
                    getter: desc.invoke.clone(),
                    member: desc.name.clone().into_boxed_str(),
                }
            }

            BoundKind::Call { target, member, args } => {
                let desc = &self.program.members[member as usize];
                ExecNode::Call {
                    target: target.map(|t| Box::new(self.lower(t))),
                    invoke: desc.invoke.clone(),
                    args: self.lower_list(args),
                    member: desc.name.clone().into_boxed_str(),
                }
            }

            BoundKind::Indexer { target, member, args } => {
                let desc = &self.program.members[member as usize];
                ExecNode::Indexer {
                    target: Box::new(self.lower(target)),
                    invoke: desc.invoke.clone(),
                    args: self.lower_list(args),
                }
            }

            BoundKind::ArrayIndex { target, indices } => ExecNode::ArrayIndex {
                target: Box::new(self.lower(target)),
                indices: self.lower_list(indices),
            },

            BoundKind::Ctor { member, args } => {
                let desc = &self.program.members[member as usize];
                ExecNode::Ctor {
                    invoke: desc.invoke.clone(),
                    args: self.lower_list(args),
                }
            }

            BoundKind::Binary { op, mode, lhs, rhs } => ExecNode::Binary {
                op,
                mode: self.lower_binary_mode(mode),
                lhs: Box::new(self.lower(lhs)),
                rhs: Box::new(self.lower(rhs)),
            },

            BoundKind::Unary { op, mode, operand } => ExecNode::Unary {
                op,
                mode: match mode {
                    UnaryMode::Numeric { rank, lifted } => ExecUnaryMode::Numeric { rank, lifted },
                    UnaryMode::EnumComplement { enum_ty, rank } => {
                        ExecUnaryMode::EnumComplement { enum_ty, rank }
                    }
                    UnaryMode::Bool => ExecUnaryMode::Bool,
                },
                operand: Box::new(self.lower(operand)),
            },

            BoundKind::Logical { and, lhs, rhs } => ExecNode::Logical {
                and,
                lhs: Box::new(self.lower(lhs)),
                rhs: Box::new(self.lower(rhs)),
            },

            BoundKind::Coalesce { lhs, rhs } => ExecNode::Coalesce {
                lhs: Box::new(self.lower(lhs)),
                rhs: Box::new(self.lower(rhs)),
            },

            BoundKind::Condition { test, if_true, if_false } => ExecNode::Condition {
                test: Box::new(self.lower(test)),
                if_true: Box::new(self.lower(if_true)),
                if_false: Box::new(self.lower(if_false)),
            },

            BoundKind::Convert { input, conversion, checked } => ExecNode::Convert {
                input: Box::new(self.lower(input)),
                kind: self.lower_conversion(conversion, expr),
                checked,
            },

            BoundKind::TypeIs { input, target } => ExecNode::TypeIs {
                input: Box::new(self.lower(input)),
                target,
                universe: self.universe.clone(),
            },

            BoundKind::TypeAs { input, target } => ExecNode::TypeAs {
                input: Box::new(self.lower(input)),
                target,
                universe: self.universe.clone(),
            },

            BoundKind::ArrayLength { input } => ExecNode::ArrayLength {
                input: Box::new(self.lower(input)),
            },

            BoundKind::NewArrayBounds { elem, bounds } => ExecNode::NewArrayBounds {
                elem,
                bounds: self.lower_list(bounds),
                fill: self.universe.default_value(elem),
            },

            BoundKind::NewArrayInit { elem, items } => ExecNode::NewArrayInit {
                elem,
                items: self.lower_list(items),
            },

            BoundKind::MemberInit { ctor, bindings } => ExecNode::MemberInit {
                ctor: Box::new(self.lower(ctor)),
                bindings: bindings
                    .iter()
                    .map(|(setter, value)| {
                        (
                            self.program.natives[*setter as usize].clone(),
                            self.lower(value),
                        )
                    })
                    .collect(),
            },

            BoundKind::ListInit { ctor, adds } => ExecNode::ListInit {
                ctor: Box::new(self.lower(ctor)),
                adds: adds
                    .iter()
                    .map(|(member, args)| {
                        let desc = &self.program.members[*member as usize];
                        (desc.invoke.clone(), self.lower_list(args))
                    })
                    .collect(),
            },

            BoundKind::Lambda { slots, body } => ExecNode::Lambda {
                ty: expr.ty,
                payload: self.lambda_payload(slots, body),
            },

            BoundKind::Quote { inner } => match inner.kind {
                BoundKind::Lambda { slots, body } => ExecNode::Quote {
                    ty: inner.ty,
                    payload: self.lambda_payload(slots, body),
                },
                // The binder only quotes lambdas; anything else lowers to
                // the inner expression unquoted.
                _ => self.lower(inner),
            },

            BoundKind::Invoke { target, args } => ExecNode::Invoke {
                target: Box::new(self.lower(target)),
                args: self.lower_list(args),
            },

            BoundKind::NullGuard { targets, body } => ExecNode::NullGuard {
                targets: self.lower_list(targets),
                body: Box::new(self.lower(body)),
            },
        }
    }

    fn lower_list(&self, exprs: &[&BoundExpr<'b>]) -> Box<[ExecNode]> {
        exprs.iter().map(|e| self.lower(e)).collect()
    }

    fn lambda_payload(&self, slots: &[usize], body: &BoundExpr<'b>) -> Arc<LambdaPayload> {
        Arc::new(LambdaPayload {
            slots: slots.iter().map(|s| SCRATCH_SLOTS + s).collect(),
            body: self.lower(body),
        })
    }

    fn lower_binary_mode(&self, mode: BinaryMode) -> ExecBinaryMode {
        match mode {
            BinaryMode::Numeric { rank, lifted } => ExecBinaryMode::Numeric { rank, lifted },
            BinaryMode::EnumArith { enum_ty, rank, lifted } => ExecBinaryMode::EnumArith {
                enum_ty,
                rank,
                lifted,
            },
            BinaryMode::Bool => ExecBinaryMode::Bool,
            BinaryMode::Concat => ExecBinaryMode::Concat,
            BinaryMode::Equality => ExecBinaryMode::Equality,
            BinaryMode::Operator { f } => ExecBinaryMode::Operator {
                f: self.program.natives[f as usize].clone(),
            },
        }
    }

    fn lower_conversion(&self, conversion: Conversion, expr: &BoundExpr<'b>) -> ExecConversion {
        match conversion {
            Conversion::Identity | Conversion::Reference | Conversion::NullableWrap => {
                ExecConversion::Identity
            }
            Conversion::Numeric { to } => ExecConversion::Numeric { to },
            Conversion::EnumToUnderlying { to } => ExecConversion::EnumToUnderlying { to },
            Conversion::UnderlyingToEnum { enum_ty } => {
                ExecConversion::UnderlyingToEnum { enum_ty }
            }
            Conversion::NullableUnwrap => ExecConversion::NullableUnwrap,
            Conversion::Unbox => ExecConversion::Unbox {
                target: expr.ty,
                target_name: self.universe.name_of(expr.ty).into_boxed_str(),
                universe: self.universe.clone(),
            },
            Conversion::Operator { f } => ExecConversion::Operator {
                f: self.program.natives[f as usize].clone(),
            },
        }
    }
}
