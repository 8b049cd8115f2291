//! Method call and lambda invocation binding.

use exprbind_core::{BindError, NodeKind, SyntaxNode};

use crate::bound::{BoundExpr, BoundKind};
use crate::expr::member::{access_type, bind_access_target};
use crate::expr::{Binder, req_node, req_str};
use crate::overload::ArgBag;

pub(crate) fn bind_call<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Call;
    let name = req_str(node, kind, "method")?;
    let null_conditional = node.bool_attr("nullConditional").unwrap_or(false);
    let span = node.span;

    let mut args = Vec::new();
    if let Some(arg_nodes) = node.nodes_attr("arguments") {
        for arg in arg_nodes {
            args.push(binder.bind_guarded(arg)?);
        }
    }
    let bag = ArgBag::positional(args);

    // Static call through a type name.
    if let Some(type_name) = node.str_attr("targetType") {
        if null_conditional {
            return Err(BindError::NullConditionalOnStatic { span });
        }
        let ty = binder.resolve_type(type_name, span)?;
        let candidates: Vec<_> = binder
            .universe
            .members(ty, name)
            .into_iter()
            .filter(|m| !m.is_data() && m.is_static())
            .collect();
        if candidates.is_empty() {
            return Err(BindError::UnknownMember {
                type_name: binder.type_name(ty),
                member: name.to_owned(),
                span,
            });
        }
        let plan = binder.resolve_overload(&candidates, &bag, span, name)?;
        let args = binder.alloc_slice(&plan.args);
        return Ok(binder.alloc(
            plan.result,
            BoundKind::Call {
                target: None,
                member: plan.member,
                args,
            },
        ));
    }

    let target = bind_access_target(binder, node)?;
    let lookup_ty = access_type(binder, target, null_conditional);
    if null_conditional {
        binder.null_targets.push(target);
    }

    let candidates: Vec<_> = binder
        .universe
        .members(lookup_ty, name)
        .into_iter()
        .filter(|m| !m.is_data() && !m.is_static())
        .collect();
    if candidates.is_empty() {
        return Err(BindError::UnknownMember {
            type_name: binder.type_name(lookup_ty),
            member: name.to_owned(),
            span,
        });
    }
    let plan = binder.resolve_overload(&candidates, &bag, span, name)?;
    let args = binder.alloc_slice(&plan.args);
    Ok(binder.alloc(
        plan.result,
        BoundKind::Call {
            target: Some(target),
            member: plan.member,
            args,
        },
    ))
}

pub(crate) fn bind_invoke<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Invoke;
    let span = node.span;
    let target = binder.bind_guarded(req_node(node, kind, "expression")?)?;

    let signature = binder
        .universe
        .try_describe(target.ty)
        .and_then(|d| match &d.kind {
            exprbind_registry::TypeKind::Lambda { params, result } => {
                Some((params.clone(), *result))
            }
            _ => None,
        });
    let Some((params, result)) = signature else {
        return Err(BindError::TypeMismatch {
            message: format!(
                "invocation target must be a lambda, got '{}'",
                binder.type_name(target.ty)
            ),
            span,
        });
    };

    let mut args = Vec::new();
    if let Some(arg_nodes) = node.nodes_attr("arguments") {
        for arg in arg_nodes {
            args.push(binder.bind_guarded(arg)?);
        }
    }
    if args.len() != params.len() {
        return Err(BindError::TypeMismatch {
            message: format!(
                "lambda expects {} argument(s), got {}",
                params.len(),
                args.len()
            ),
            span,
        });
    }
    let mut coerced = Vec::with_capacity(args.len());
    for (arg, param_ty) in args.into_iter().zip(params) {
        coerced.push(binder.coerce_or_err(arg, param_ty, false, span, "lambda argument")?);
    }
    let args = binder.alloc_slice(&coerced);
    Ok(binder.alloc(result, BoundKind::Invoke { target, args }))
}
