//! Construction binding: `New`, array creation, and the two initializer
//! forms.
//!
//! A `MemberInit` node carries its constructor under `newExpression`; every
//! other attribute is a member binding, in attribute order. A `ListInit`
//! node routes each element of `initializers` through the target type's
//! `add` method with full overload scoring.

use exprbind_core::{BindError, NodeKind, SyntaxNode, primitives};

use crate::bound::{BoundExpr, BoundKind};
use crate::expr::{Binder, req_node, req_nodes, req_str};
use crate::overload::ArgBag;

pub(crate) fn bind_new<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::New;
    let span = node.span;
    let type_name = req_str(node, kind, "typeName")?;
    let ty = binder.resolve_type(type_name, span)?;

    let mut args = Vec::new();
    if let Some(arg_nodes) = node.nodes_attr("arguments") {
        for arg in arg_nodes {
            args.push(binder.bind_guarded(arg)?);
        }
    }

    let ctors = binder.universe.constructors(ty);
    if ctors.is_empty() {
        return Err(BindError::UnknownMember {
            type_name: binder.type_name(ty),
            member: "constructor".into(),
            span,
        });
    }
    let bag = ArgBag::positional(args);
    let plan = binder.resolve_overload(&ctors, &bag, span, type_name)?;
    let args = binder.alloc_slice(&plan.args);
    Ok(binder.alloc(
        ty,
        BoundKind::Ctor {
            member: plan.member,
            args,
        },
    ))
}

pub(crate) fn bind_new_array_bounds<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::NewArrayBounds;
    let span = node.span;
    let elem = binder.resolve_type(req_str(node, kind, "typeName")?, span)?;
    let bound_nodes = req_nodes(node, kind, "bounds")?;
    if bound_nodes.is_empty() {
        return Err(BindError::BadAttribute {
            kind: kind.as_str(),
            attr: "bounds",
            detail: "must contain at least one dimension".into(),
            span,
        });
    }
    let mut bounds = Vec::with_capacity(bound_nodes.len());
    for bound in bound_nodes {
        let expr = binder.bind_guarded(bound)?;
        bounds.push(binder.coerce_or_err(expr, primitives::I32, false, span, "array bound")?);
    }
    let ty = binder.universe.array_of(elem, bounds.len() as u32);
    let bounds = binder.alloc_slice(&bounds);
    Ok(binder.alloc(ty, BoundKind::NewArrayBounds { elem, bounds }))
}

pub(crate) fn bind_new_array_init<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::NewArrayInit;
    let span = node.span;
    let elem = binder.resolve_type(req_str(node, kind, "typeName")?, span)?;
    let item_nodes = req_nodes(node, kind, "initializers")?;
    let mut items = Vec::with_capacity(item_nodes.len());
    for item in item_nodes {
        let expr = binder.bind_guarded(item)?;
        items.push(binder.coerce_or_err(expr, elem, false, span, "array element")?);
    }
    let ty = binder.universe.array_of(elem, 1);
    let items = binder.alloc_slice(&items);
    Ok(binder.alloc(ty, BoundKind::NewArrayInit { elem, items }))
}

pub(crate) fn bind_member_init<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::MemberInit;
    let span = node.span;
    let ctor = binder.bind_guarded(req_node(node, kind, "newExpression")?)?;

    let mut bindings = Vec::new();
    for (attr_name, attr_value) in &node.attrs {
        if attr_name == "newExpression" {
            continue;
        }
        let value_node = match attr_value {
            exprbind_core::AttrValue::Node(n) => n,
            _ => {
                return Err(BindError::BadAttribute {
                    kind: kind.as_str(),
                    attr: "bindings",
                    detail: format!("binding '{attr_name}' must be an expression node"),
                    span,
                });
            }
        };
        let member = binder
            .universe
            .members(ctor.ty, attr_name)
            .into_iter()
            .find(|m| m.is_data() && !m.is_static())
            .ok_or_else(|| BindError::UnknownMember {
                type_name: binder.type_name(ctor.ty),
                member: attr_name.clone(),
                span,
            })?;
        let Some(setter) = member.set.clone() else {
            return Err(BindError::Invalid {
                message: format!(
                    "member '{attr_name}' of '{}' is read-only",
                    binder.type_name(ctor.ty)
                ),
                span,
            });
        };
        let value = binder.bind_guarded(value_node)?;
        let value = binder.coerce_or_err(value, member.result, false, span, "member binding")?;
        let setter = binder.add_native(setter);
        bindings.push((setter, value));
    }

    let bindings = binder.arena.alloc_slice_copy(&bindings);
    Ok(binder.alloc(ctor.ty, BoundKind::MemberInit { ctor, bindings }))
}

pub(crate) fn bind_list_init<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let kind = NodeKind::ListInit;
    let span = node.span;
    let ctor = binder.bind_guarded(req_node(node, kind, "newExpression")?)?;

    let adders: Vec<_> = binder
        .universe
        .members(ctor.ty, "add")
        .into_iter()
        .filter(|m| !m.is_data() && !m.is_static())
        .collect();
    if adders.is_empty() {
        return Err(BindError::UnknownMember {
            type_name: binder.type_name(ctor.ty),
            member: "add".into(),
            span,
        });
    }

    let mut adds = Vec::new();
    for item in req_nodes(node, kind, "initializers")? {
        let element = binder.bind_guarded(item)?;
        let bag = ArgBag::positional(vec![element]);
        let plan = binder.resolve_overload(&adders, &bag, span, "add")?;
        let args = binder.alloc_slice(&plan.args);
        adds.push((plan.member, args));
    }

    let adds = binder.arena.alloc_slice_copy(&adds);
    Ok(binder.alloc(ctor.ty, BoundKind::ListInit { ctor, adds }))
}
