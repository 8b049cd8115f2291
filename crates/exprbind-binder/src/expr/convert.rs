//! Conversion-family binders: casts, type tests, `TypeOf`, `Default`.

use exprbind_core::{BindError, NodeKind, SyntaxNode, Value, primitives};

use crate::bound::{BoundExpr, BoundKind, Conversion};
use crate::expr::{Binder, req_node, req_str};

pub(crate) fn bind_convert<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
    checked: bool,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = if checked {
        NodeKind::ConvertChecked
    } else {
        NodeKind::Convert
    };
    let span = node.span;
    let input = binder.bind_guarded(req_node(node, kind, "expression")?)?;
    let target = binder.resolve_type(req_str(node, kind, "typeName")?, span)?;

    let Some(coerced) = binder.coerce(input, target, true) else {
        return Err(BindError::TypeMismatch {
            message: format!(
                "no conversion from '{}' to '{}'",
                binder.type_name(input.ty),
                binder.type_name(target),
            ),
            span,
        });
    };
    if checked {
        return Ok(mark_checked(binder, coerced.expr));
    }
    Ok(coerced.expr)
}

/// Re-tag the conversion chain produced by a coercion as overflow-checked.
fn mark_checked<'b>(binder: &Binder<'b, '_>, expr: &'b BoundExpr<'b>) -> &'b BoundExpr<'b> {
    match expr.kind {
        BoundKind::Convert {
            input,
            conversion,
            checked: _,
        } => {
            let inner = mark_checked(binder, input);
            binder.alloc(
                expr.ty,
                BoundKind::Convert {
                    input: inner,
                    conversion,
                    checked: true,
                },
            )
        }
        _ => expr,
    }
}

pub(crate) fn bind_type_is<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::TypeIs;
    let input = binder.bind_guarded(req_node(node, kind, "expression")?)?;
    let target = binder.resolve_type(req_str(node, kind, "typeName")?, node.span)?;
    Ok(binder.alloc(primitives::BOOL, BoundKind::TypeIs { input, target }))
}

pub(crate) fn bind_type_as<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::TypeAs;
    let input = binder.bind_guarded(req_node(node, kind, "expression")?)?;
    let target = binder.resolve_type(req_str(node, kind, "typeName")?, node.span)?;
    // `as` must be able to yield null: value types get their nullable form.
    let result_ty = match binder.universe.try_describe(target) {
        Some(desc) if desc.accepts_null() => target,
        _ => binder.universe.nullable_of(target),
    };
    Ok(binder.alloc(result_ty, BoundKind::TypeAs { input, target }))
}

pub(crate) fn bind_type_of<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let ty = binder.resolve_type(req_str(node, NodeKind::TypeOf, "typeName")?, node.span)?;
    Ok(binder.constant(primitives::TYPE, Value::Type(ty)))
}

pub(crate) fn bind_default<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let ty = binder.resolve_type(req_str(node, NodeKind::Default, "typeName")?, node.span)?;
    let value = binder.universe.default_value(ty);
    Ok(binder.constant(ty, value))
}
