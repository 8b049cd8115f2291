//! Lambda, parameter, and quote binding.
//!
//! Lambda parameters are allocated fresh frame slots after the declared
//! parameters; the body is bound with those names shadowing the outer
//! scope. `Parameter` nodes resolve innermost-scope-first.

use exprbind_core::{BindError, NodeKind, SyntaxNode, TypeHash};

use crate::bound::{BoundExpr, BoundKind};
use crate::expr::{Binder, req_node, req_nodes, req_str};

pub(crate) fn bind_lambda<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Lambda;
    let span = node.span;

    let mut params: Vec<(String, TypeHash)> = Vec::new();
    for param in req_nodes(node, kind, "parameters")? {
        if param.kind != NodeKind::Parameter.as_str() {
            return Err(BindError::BadAttribute {
                kind: kind.as_str(),
                attr: "parameters",
                detail: "every entry must be a Parameter node".into(),
                span,
            });
        }
        let name = req_str(param, NodeKind::Parameter, "name")?;
        let ty = binder.resolve_type(req_str(param, NodeKind::Parameter, "type")?, param.span)?;
        if params.iter().any(|(n, _)| n == name) {
            return Err(BindError::Invalid {
                message: format!("duplicate lambda parameter '{name}'"),
                span: param.span,
            });
        }
        params.push((name.to_owned(), ty));
    }

    let slots = binder.scopes.push_lambda(&params);
    let body = binder.bind_guarded(req_node(node, kind, "body")?);
    binder.scopes.pop_lambda();
    let body = body?;

    let param_types: Vec<TypeHash> = params.iter().map(|(_, t)| *t).collect();
    let ty = binder.universe.lambda_of(&param_types, body.ty);
    let slots = binder.arena.alloc_slice_copy(&slots);
    Ok(binder.alloc(ty, BoundKind::Lambda { slots, body }))
}

pub(crate) fn bind_parameter<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let name = req_str(node, NodeKind::Parameter, "name")?;
    match binder.scopes.lookup(name) {
        Some((slot, ty)) => Ok(binder.alloc(ty, BoundKind::Parameter { slot })),
        None => Err(BindError::Invalid {
            message: format!("undeclared parameter '{name}'"),
            span: node.span,
        }),
    }
}

pub(crate) fn bind_quote<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let inner = binder.bind_node(req_node(node, NodeKind::Quote, "expression")?)?;
    if !matches!(inner.kind, BoundKind::Lambda { .. }) {
        return Err(BindError::Invalid {
            message: "Quote requires a lambda operand".into(),
            span: node.span,
        });
    }
    Ok(binder.alloc(inner.ty, BoundKind::Quote { inner }))
}
