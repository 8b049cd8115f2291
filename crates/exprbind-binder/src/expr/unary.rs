//! Unary expression binding.

use exprbind_core::{BindError, NodeKind, NumericRank, SyntaxNode, UnaryOp, primitives};

use crate::bound::{BoundExpr, BoundKind, Conversion, UnaryMode};
use crate::expr::{Binder, req_node};
use crate::promote;

pub(crate) fn bind_unary<'b>(
    binder: &mut Binder<'b, '_>,
    kind: NodeKind,
    op: UnaryOp,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let span = node.span;
    let operand = binder.bind_guarded(req_node(node, kind, "expression")?)?;

    let mismatch = |binder: &Binder<'b, '_>| BindError::TypeMismatch {
        message: format!(
            "operator '{}' is not defined for '{}'",
            op.symbol(),
            binder.type_name(operand.ty),
        ),
        span,
    };

    if op == UnaryOp::Not {
        let (core, lifted) = split_nullable(binder, operand.ty);
        if core != primitives::BOOL {
            return Err(mismatch(binder));
        }
        let ty = if lifted {
            binder.universe.nullable_of(primitives::BOOL)
        } else {
            primitives::BOOL
        };
        return Ok(binder.alloc(
            ty,
            BoundKind::Unary {
                op,
                mode: UnaryMode::Bool,
                operand,
            },
        ));
    }

    let (core, lifted) = split_nullable(binder, operand.ty);

    // Complement of an enum value stays in the enum (flag inversion).
    if op == UnaryOp::Complement {
        if let Some(desc) = binder.universe.try_describe(core) {
            if let Some(underlying) = desc.enum_underlying() {
                let rank = promote::promote_single(underlying);
                let converted = binder.convert(
                    operand,
                    rank.hash(),
                    Conversion::EnumToUnderlying { to: rank },
                    false,
                );
                return Ok(binder.alloc(
                    operand.ty,
                    BoundKind::Unary {
                        op,
                        mode: UnaryMode::EnumComplement {
                            enum_ty: core,
                            rank,
                        },
                        operand: converted,
                    },
                ));
            }
        }
    }

    let Some(rank) = NumericRank::of(core) else {
        return Err(mismatch(binder));
    };

    let promoted = match op {
        UnaryOp::Negate => promote::promote_negate(rank).map_err(|err| {
            BindError::NumericPromotion {
                message: format!(
                    "operator '-' on '{}': {err}",
                    binder.type_name(operand.ty)
                ),
                span,
            }
        })?,
        UnaryOp::Complement => {
            if !rank.is_integer() {
                return Err(mismatch(binder));
            }
            promote::promote_single(rank)
        }
        UnaryOp::UnaryPlus | UnaryOp::Not => promote::promote_single(rank),
    };

    let operand = widen_operand(binder, operand, rank, promoted, lifted);
    let result_ty = if lifted {
        binder.universe.nullable_of(promoted.hash())
    } else {
        promoted.hash()
    };
    Ok(binder.alloc(
        result_ty,
        BoundKind::Unary {
            op,
            mode: UnaryMode::Numeric {
                rank: promoted,
                lifted,
            },
            operand,
        },
    ))
}

fn split_nullable(binder: &Binder<'_, '_>, ty: exprbind_core::TypeHash) -> (exprbind_core::TypeHash, bool) {
    match binder
        .universe
        .try_describe(ty)
        .and_then(|d| d.nullable_underlying())
    {
        Some(underlying) => (underlying, true),
        None => (ty, false),
    }
}

fn widen_operand<'b>(
    binder: &mut Binder<'b, '_>,
    operand: &'b BoundExpr<'b>,
    rank: NumericRank,
    promoted: NumericRank,
    lifted: bool,
) -> &'b BoundExpr<'b> {
    if rank == promoted {
        return operand;
    }
    if lifted {
        return binder.lift_numeric(operand, promoted);
    }
    if let Some(value) = binder.const_value(operand) {
        if let Some(folded) = value.cast_numeric(promoted, true) {
            return binder.constant(promoted.hash(), folded);
        }
    }
    binder.convert(
        operand,
        promoted.hash(),
        Conversion::Numeric { to: promoted },
        false,
    )
}
