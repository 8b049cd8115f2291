//! Member access binding: fields/properties, indexers, array length.
//!
//! A `PropertyOrField` node targets either an `expression` child, a
//! `targetType` name (static access, including enum values), or — with
//! neither — the implicit root declared on the signature. The optional
//! `nullConditional` attribute marks `?.`/`?[` access: the target is
//! registered on the open null-propagation chain, and the access itself
//! resolves against the target's non-nullable form.

use exprbind_core::{BindError, NodeKind, SyntaxNode, TypeHash, Value, primitives};
use exprbind_registry::MemberDesc;

use crate::bound::{BoundExpr, BoundKind};
use crate::expr::{Binder, req_node, req_nodes, req_str};
use crate::overload::ArgBag;

pub(crate) fn bind_property_or_field<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::PropertyOrField;
    let name = req_str(node, kind, "member")?;
    let null_conditional = node.bool_attr("nullConditional").unwrap_or(false);
    let span = node.span;

    // Static access through a type name.
    if let Some(type_name) = node.str_attr("targetType") {
        if null_conditional {
            return Err(BindError::NullConditionalOnStatic { span });
        }
        let ty = binder.resolve_type(type_name, span)?;
        if let Some(desc) = binder.universe.try_describe(ty) {
            // Enum values resolve to constants.
            if let Some(raw) = desc.enum_value(name) {
                return Ok(binder.constant(ty, Value::Enum { ty, raw }));
            }
        }
        let member = data_member(binder, ty, name, true).ok_or_else(|| unknown_member(
            binder, ty, name, span,
        ))?;
        let result = member.result;
        let member = binder.add_member(member);
        return Ok(binder.alloc(
            result,
            BoundKind::Field {
                target: None,
                member,
            },
        ));
    }

    let target = bind_access_target(binder, node)?;
    let lookup_ty = access_type(binder, target, null_conditional);
    if null_conditional {
        binder.null_targets.push(target);
    }

    let member = data_member(binder, lookup_ty, name, false)
        .ok_or_else(|| unknown_member(binder, lookup_ty, name, span))?;
    let result = member.result;
    let member = binder.add_member(member);
    Ok(binder.alloc(
        result,
        BoundKind::Field {
            target: Some(target),
            member,
        },
    ))
}

pub(crate) fn bind_index<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::Index;
    let span = node.span;
    let target = binder.bind_node(req_node(node, kind, "expression")?)?;
    let null_conditional = node.bool_attr("nullConditional").unwrap_or(false);
    let lookup_ty = access_type(binder, target, null_conditional);
    if null_conditional {
        binder.null_targets.push(target);
    }

    let arg_nodes = req_nodes(node, kind, "arguments")?;
    let mut args = Vec::with_capacity(arg_nodes.len());
    for arg in arg_nodes {
        args.push(binder.bind_guarded(arg)?);
    }

    // Arrays index directly, one index per dimension.
    if let Some(desc) = binder.universe.try_describe(lookup_ty) {
        if let exprbind_registry::TypeKind::Array { elem, rank } = desc.kind {
            if args.len() != rank as usize {
                return Err(BindError::TypeMismatch {
                    message: format!(
                        "array of rank {rank} requires {rank} index(es), got {}",
                        args.len()
                    ),
                    span,
                });
            }
            let mut indices = Vec::with_capacity(args.len());
            for arg in args {
                indices.push(binder.coerce_or_err(
                    arg,
                    primitives::I32,
                    false,
                    span,
                    "array index",
                )?);
            }
            let indices = binder.alloc_slice(&indices);
            return Ok(binder.alloc(elem, BoundKind::ArrayIndex { target, indices }));
        }
    }

    // Everything else goes through registered indexers.
    let indexers = binder.universe.indexers(lookup_ty);
    if indexers.is_empty() {
        return Err(BindError::TypeMismatch {
            message: format!("type '{}' is not indexable", binder.type_name(lookup_ty)),
            span,
        });
    }
    let bag = ArgBag::positional(args);
    let plan = binder.resolve_overload(&indexers, &bag, span, "indexer")?;
    let args = binder.alloc_slice(&plan.args);
    Ok(binder.alloc(
        plan.result,
        BoundKind::Indexer {
            target,
            member: plan.member,
            args,
        },
    ))
}

pub(crate) fn bind_array_length<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::ArrayLength;
    let input = binder.bind_guarded(req_node(node, kind, "expression")?)?;
    let is_array = binder
        .universe
        .try_describe(input.ty)
        .map(|d| matches!(d.kind, exprbind_registry::TypeKind::Array { .. }))
        .unwrap_or(false);
    if !is_array {
        return Err(BindError::TypeMismatch {
            message: format!(
                "ArrayLength requires an array, got '{}'",
                binder.type_name(input.ty)
            ),
            span: node.span,
        });
    }
    Ok(binder.alloc(primitives::I32, BoundKind::ArrayLength { input }))
}

/// The `expression` child, or the implicit root when absent.
pub(crate) fn bind_access_target<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    match node.node_attr("expression") {
        // The chain continues through the target: no guard here.
        Some(expr_node) => binder.bind_node(expr_node),
        None => match binder.this_slot {
            Some((slot, ty)) => Ok(binder.alloc(ty, BoundKind::Parameter { slot })),
            None => Err(BindError::Invalid {
                message: "member access has no target and no implicit root is declared".into(),
                span: node.span,
            }),
        },
    }
}

/// Type member lookup runs against: the target type, or its non-nullable
/// form under null-conditional access.
pub(crate) fn access_type<'b>(
    binder: &Binder<'b, '_>,
    target: &'b BoundExpr<'b>,
    null_conditional: bool,
) -> TypeHash {
    if !null_conditional {
        return target.ty;
    }
    binder
        .universe
        .try_describe(target.ty)
        .and_then(|d| d.nullable_underlying())
        .unwrap_or(target.ty)
}

fn data_member(
    binder: &Binder<'_, '_>,
    ty: TypeHash,
    name: &str,
    want_static: bool,
) -> Option<MemberDesc> {
    binder
        .universe
        .members(ty, name)
        .into_iter()
        .find(|m| m.is_data() && m.is_static() == want_static)
}

fn unknown_member(
    binder: &Binder<'_, '_>,
    ty: TypeHash,
    name: &str,
    span: Option<exprbind_core::Span>,
) -> BindError {
    BindError::UnknownMember {
        type_name: binder.type_name(ty),
        member: name.to_owned(),
        span,
    }
}
