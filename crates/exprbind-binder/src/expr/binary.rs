//! Binary expression binding.
//!
//! Resolution order: string concatenation (an `Add` with either operand a
//! string is concatenation regardless of the other side), user-declared
//! operator overloads, the builtin numeric/enum/nullable promotion path,
//! then non-numeric equality.

use ordered_float::OrderedFloat;

use exprbind_core::{BinaryOp, BindError, NodeKind, NumericRank, SyntaxNode, TypeHash, primitives};
use exprbind_registry::BinaryOperatorDesc;

use crate::bound::{BinaryMode, BoundExpr, BoundKind, Conversion};
use crate::expr::{Binder, req_node};
use crate::promote::{self, PromotionError};

pub(crate) fn bind_binary<'b>(
    binder: &mut Binder<'b, '_>,
    kind: NodeKind,
    op: BinaryOp,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let span = node.span;
    let lhs = binder.bind_guarded(req_node(node, kind, "left")?)?;
    let rhs = binder.bind_guarded(req_node(node, kind, "right")?)?;

    // String concatenation wins over everything else for Add.
    if op == BinaryOp::Add && (lhs.ty == primitives::STRING || rhs.ty == primitives::STRING) {
        return Ok(binder.alloc(
            primitives::STRING,
            BoundKind::Binary {
                op,
                mode: BinaryMode::Concat,
                lhs,
                rhs,
            },
        ));
    }

    // User-declared operator overloads on either operand type.
    if let Some(bound) = bind_operator_overload(binder, op, lhs, rhs)? {
        return Ok(bound);
    }

    // Non-short-circuit boolean &, |, ^.
    if op.is_integer_only()
        && !op.is_shift()
        && lhs.ty == primitives::BOOL
        && rhs.ty == primitives::BOOL
    {
        return Ok(binder.alloc(
            primitives::BOOL,
            BoundKind::Binary {
                op,
                mode: BinaryMode::Bool,
                lhs,
                rhs,
            },
        ));
    }

    // Builtin numeric / enum / nullable promotion.
    if let Some(bound) = bind_numeric(binder, op, lhs, rhs, span)? {
        return Ok(bound);
    }

    // Non-numeric equality: strings, bools, enums of one type, references.
    if op.is_equality() {
        if let Some(bound) = bind_equality(binder, op, lhs, rhs) {
            return Ok(bound);
        }
    }

    Err(BindError::TypeMismatch {
        message: format!(
            "operator '{}' is not defined for '{}' and '{}'",
            op.symbol(),
            binder.type_name(lhs.ty),
            binder.type_name(rhs.ty),
        ),
        span,
    })
}

/// One operand of the promotion path: its numeric shape after peeling
/// nullable wrappers and enums.
struct Operand {
    rank: NumericRank,
    lifted: bool,
    enum_ty: Option<TypeHash>,
}

fn classify(binder: &Binder<'_, '_>, ty: TypeHash) -> Option<Operand> {
    let desc = binder.universe.try_describe(ty)?;
    let (core, lifted) = match desc.nullable_underlying() {
        Some(underlying) => (underlying, true),
        None => (ty, false),
    };
    let core_desc = binder.universe.try_describe(core)?;
    if let Some(underlying) = core_desc.enum_underlying() {
        return Some(Operand {
            rank: underlying,
            lifted,
            enum_ty: Some(core),
        });
    }
    NumericRank::of(core).map(|rank| Operand {
        rank,
        lifted,
        enum_ty: None,
    })
}

fn bind_numeric<'b>(
    binder: &mut Binder<'b, '_>,
    op: BinaryOp,
    lhs: &'b BoundExpr<'b>,
    rhs: &'b BoundExpr<'b>,
    span: Option<exprbind_core::Span>,
) -> Result<Option<&'b BoundExpr<'b>>, BindError> {
    let Some(left) = classify(binder, lhs.ty) else {
        return Ok(None);
    };
    let Some(right) = classify(binder, rhs.ty) else {
        return Ok(None);
    };
    let lifted = left.lifted || right.lifted;

    // Enum operands: arithmetic runs on the underlying rank; additive and
    // bitwise results re-wrap as the enum type, enum-minus-enum and the
    // comparisons stay on the underlying/bool.
    let enum_ty = match (left.enum_ty, right.enum_ty) {
        (Some(a), Some(b)) if a != b => {
            return Err(BindError::TypeMismatch {
                message: format!(
                    "operator '{}' cannot mix enum types '{}' and '{}'",
                    op.symbol(),
                    binder.type_name(a),
                    binder.type_name(b),
                ),
                span,
            });
        }
        (Some(a), _) => Some(a),
        (_, Some(b)) => Some(b),
        (None, None) => None,
    };

    // Shifts promote the left operand alone; the count is always i32.
    let rank = if op.is_shift() {
        if !left.rank.is_integer() {
            return Ok(None);
        }
        promote::promote_single(left.rank)
    } else {
        match promote::promote_pair(left.rank, right.rank) {
            Ok(rank) => rank,
            Err(err) => return Err(promotion_error(binder, op, lhs, rhs, err, span)),
        }
    };

    if op.is_integer_only() && !rank.is_integer() {
        return Ok(None);
    }
    // Power runs on floating point (or decimal) even for integer operands.
    let rank = if op == BinaryOp::Power && rank.is_integer() {
        NumericRank::F64
    } else {
        rank
    };

    let (mode, result_ty) = match (op.is_comparison(), enum_ty) {
        (true, _) => (BinaryMode::Numeric { rank, lifted }, primitives::BOOL),
        (false, Some(enum_ty)) => {
            let rewraps = matches!(
                op,
                BinaryOp::Add | BinaryOp::And | BinaryOp::Or | BinaryOp::ExclusiveOr
            ) || (op == BinaryOp::Subtract
                && !(left.enum_ty.is_some() && right.enum_ty.is_some()));
            if rewraps {
                let ty = lift_ty(binder, enum_ty, lifted);
                (
                    BinaryMode::EnumArith {
                        enum_ty,
                        rank,
                        lifted,
                    },
                    ty,
                )
            } else if matches!(op, BinaryOp::Subtract) {
                (BinaryMode::Numeric { rank, lifted }, lift_ty(binder, rank.hash(), lifted))
            } else {
                return Ok(None);
            }
        }
        (false, None) => (
            BinaryMode::Numeric { rank, lifted },
            lift_ty(binder, rank.hash(), lifted),
        ),
    };

    let lhs = convert_operand(binder, lhs, &left, rank, lifted);
    let count_rank = if op.is_shift() { NumericRank::I32 } else { rank };
    let rhs = convert_operand(binder, rhs, &right, count_rank, lifted);

    Ok(Some(binder.alloc(
        result_ty,
        BoundKind::Binary { op, mode, lhs, rhs },
    )))
}

fn lift_ty(binder: &Binder<'_, '_>, ty: TypeHash, lifted: bool) -> TypeHash {
    if lifted {
        binder.universe.nullable_of(ty)
    } else {
        ty
    }
}

/// Coerce one operand to the promoted rank, unwrapping enums first and
/// preserving nulls for lifted operands.
fn convert_operand<'b>(
    binder: &mut Binder<'b, '_>,
    expr: &'b BoundExpr<'b>,
    operand: &Operand,
    rank: NumericRank,
    lifted: bool,
) -> &'b BoundExpr<'b> {
    let mut current = expr;
    if operand.enum_ty.is_some() {
        let ty = lift_ty(binder, rank.hash(), lifted);
        current = binder.convert(current, ty, Conversion::EnumToUnderlying { to: rank }, false);
        return current;
    }
    if operand.rank == rank && operand.lifted == lifted {
        return current;
    }
    if lifted {
        return binder.lift_numeric(current, rank);
    }
    if let Some(value) = binder.const_value(current) {
        if let Some(folded) = value.cast_numeric(rank, true) {
            return binder.constant(rank.hash(), folded);
        }
    }
    binder.convert(current, rank.hash(), Conversion::Numeric { to: rank }, false)
}

fn promotion_error(
    binder: &Binder<'_, '_>,
    op: BinaryOp,
    lhs: &BoundExpr<'_>,
    rhs: &BoundExpr<'_>,
    err: PromotionError,
    span: Option<exprbind_core::Span>,
) -> BindError {
    BindError::NumericPromotion {
        message: format!(
            "operator '{}' on '{}' and '{}': {err}",
            op.symbol(),
            binder.type_name(lhs.ty),
            binder.type_name(rhs.ty),
        ),
        span,
    }
}

/// Try the user-declared operator overloads of both operand types.
fn bind_operator_overload<'b>(
    binder: &mut Binder<'b, '_>,
    op: BinaryOp,
    lhs: &'b BoundExpr<'b>,
    rhs: &'b BoundExpr<'b>,
) -> Result<Option<&'b BoundExpr<'b>>, BindError> {
    let mut operand_types = vec![lhs.ty];
    if rhs.ty != lhs.ty {
        operand_types.push(rhs.ty);
    }
    let mut candidates: Vec<BinaryOperatorDesc> = Vec::new();
    for ty in operand_types {
        if let Some(desc) = binder.universe.try_describe(ty) {
            candidates.extend(desc.operators.binary_overloads(op).cloned());
        }
    }
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut best: Option<(&BinaryOperatorDesc, f64)> = None;
    let mut best_args: Option<(&'b BoundExpr<'b>, &'b BoundExpr<'b>)> = None;
    for candidate in &candidates {
        let Some(left) = binder.coerce(lhs, candidate.lhs, false) else {
            continue;
        };
        let Some(right) = binder.coerce(rhs, candidate.rhs, false) else {
            continue;
        };
        let score = (left.quality + right.quality) / 2.0;
        let replace = match best {
            Some((_, best_score)) => OrderedFloat(score) > OrderedFloat(best_score),
            None => true,
        };
        if replace {
            best = Some((candidate, score));
            best_args = Some((left.expr, right.expr));
            if score == exprbind_registry::quality::EXACT {
                break;
            }
        }
    }

    let (Some((candidate, _)), Some((left, right))) = (best, best_args) else {
        return Ok(None);
    };
    let f = binder.add_native(candidate.invoke.clone());
    Ok(Some(binder.alloc(
        candidate.result,
        BoundKind::Binary {
            op,
            mode: BinaryMode::Operator { f },
            lhs: left,
            rhs: right,
        },
    )))
}

/// Equality on non-numeric operands: identical types compare structurally;
/// otherwise one side must coerce implicitly to the other.
fn bind_equality<'b>(
    binder: &mut Binder<'b, '_>,
    op: BinaryOp,
    lhs: &'b BoundExpr<'b>,
    rhs: &'b BoundExpr<'b>,
) -> Option<&'b BoundExpr<'b>> {
    let alloc = |binder: &mut Binder<'b, '_>, l, r| {
        Some(binder.alloc(
            primitives::BOOL,
            BoundKind::Binary {
                op,
                mode: BinaryMode::Equality,
                lhs: l,
                rhs: r,
            },
        ))
    };
    if lhs.ty == rhs.ty {
        return alloc(binder, lhs, rhs);
    }
    if let Some(coerced) = binder.coerce(rhs, lhs.ty, false) {
        let r = coerced.expr;
        return alloc(binder, lhs, r);
    }
    if let Some(coerced) = binder.coerce(lhs, rhs.ty, false) {
        let l = coerced.expr;
        return alloc(binder, l, rhs);
    }
    None
}
