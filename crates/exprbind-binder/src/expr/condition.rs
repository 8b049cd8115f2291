//! Conditional, short-circuit logical, and coalescing binders.
//!
//! All three forms evaluate exactly one branch at run time; the binder only
//! guarantees the branch types meet.

use exprbind_core::{BindError, NodeKind, SyntaxNode, primitives};

use crate::bound::{BoundExpr, BoundKind};
use crate::expr::{Binder, req_node};

pub(crate) fn bind_condition<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Condition;
    let test = binder.bind_guarded(req_node(node, kind, "test")?)?;
    let test = binder.coerce_or_err(test, primitives::BOOL, false, node.span, "condition test")?;
    let if_true = binder.bind_guarded(req_node(node, kind, "ifTrue")?)?;
    let if_false = binder.bind_guarded(req_node(node, kind, "ifFalse")?)?;

    // Branch unification: identical types, else one branch coerces to the
    // other (preferring the true branch's type).
    let (ty, if_true, if_false) = if if_true.ty == if_false.ty {
        (if_true.ty, if_true, if_false)
    } else if let Some(coerced) = binder.coerce(if_false, if_true.ty, false) {
        (if_true.ty, if_true, coerced.expr)
    } else if let Some(coerced) = binder.coerce(if_true, if_false.ty, false) {
        (if_false.ty, coerced.expr, if_false)
    } else {
        return Err(BindError::TypeMismatch {
            message: format!(
                "conditional branches have incompatible types '{}' and '{}'",
                binder.type_name(if_true.ty),
                binder.type_name(if_false.ty),
            ),
            span: node.span,
        });
    };

    Ok(binder.alloc(
        ty,
        BoundKind::Condition {
            test,
            if_true,
            if_false,
        },
    ))
}

pub(crate) fn bind_logical<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
    and: bool,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = if and { NodeKind::AndAlso } else { NodeKind::OrElse };
    let lhs = binder.bind_guarded(req_node(node, kind, "left")?)?;
    let lhs = binder.coerce_or_err(lhs, primitives::BOOL, false, node.span, "logical operand")?;
    let rhs = binder.bind_guarded(req_node(node, kind, "right")?)?;
    let rhs = binder.coerce_or_err(rhs, primitives::BOOL, false, node.span, "logical operand")?;
    Ok(binder.alloc(primitives::BOOL, BoundKind::Logical { and, lhs, rhs }))
}

pub(crate) fn bind_coalesce<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Coalesce;
    let lhs = binder.bind_guarded(req_node(node, kind, "left")?)?;
    let rhs = binder.bind_guarded(req_node(node, kind, "right")?)?;

    let lhs_desc = binder
        .universe
        .try_describe(lhs.ty)
        .ok_or_else(|| BindError::UnknownType {
            name: binder.type_name(lhs.ty),
            span: node.span,
        })?;
    if !lhs_desc.accepts_null() {
        return Err(BindError::TypeMismatch {
            message: format!(
                "left operand of '??' must be nullable, got '{}'",
                binder.type_name(lhs.ty)
            ),
            span: node.span,
        });
    }

    // When the left side is T? and the right side fits T, the result
    // unwraps to T; otherwise the right side coerces to the left type.
    if let Some(underlying) = lhs_desc.nullable_underlying() {
        if let Some(coerced) = binder.coerce(rhs, underlying, false) {
            let rhs = coerced.expr;
            return Ok(binder.alloc(underlying, BoundKind::Coalesce { lhs, rhs }));
        }
    }
    let rhs = binder.coerce_or_err(rhs, lhs.ty, false, node.span, "coalesce fallback")?;
    Ok(binder.alloc(lhs.ty, BoundKind::Coalesce { lhs, rhs }))
}
