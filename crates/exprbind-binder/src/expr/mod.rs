//! Per-node-kind binders behind a single dispatch.
//!
//! The [`Binder`] walks the input syntax tree top-down. Each node kind has
//! its own binder function `(binder, node) -> bound expression`; dispatch
//! is one match over the parsed [`NodeKind`]. Sub-expressions consumed as
//! independent values go through [`Binder::bind_guarded`], which closes any
//! null-propagation chain opened inside them.

pub(crate) mod binary;
pub(crate) mod calls;
pub(crate) mod condition;
pub(crate) mod constant;
pub(crate) mod convert;
pub(crate) mod lambda;
pub(crate) mod member;
pub(crate) mod new;
pub(crate) mod unary;

use bumpalo::Bump;
use tracing::trace;

use exprbind_core::{
    BinaryOp, BindError, NativeFn, NodeKind, Span, SyntaxNode, TypeHash, UnaryOp, Value,
    primitives,
};
use exprbind_registry::{MemberDesc, TypeUniverse};

use crate::bound::{BoundExpr, BoundKind, Conversion, ConstId, MemberId, NativeId};
use crate::context::Scopes;

/// Walks a syntax tree and produces the bound graph.
///
/// One binder instance serves one bind call; it owns the side tables the
/// finished [`crate::bound::BoundProgram`] carries.
pub struct Binder<'b, 'u> {
    pub(crate) arena: &'b Bump,
    pub(crate) universe: &'u TypeUniverse,
    pub(crate) scopes: Scopes,
    /// Slot and type of the implicit root, when the signature declares one.
    pub(crate) this_slot: Option<(usize, TypeHash)>,
    /// Targets of the innermost open null-conditional chain.
    pub(crate) null_targets: Vec<&'b BoundExpr<'b>>,
    pub(crate) consts: Vec<Value>,
    pub(crate) members: Vec<MemberDesc>,
    pub(crate) natives: Vec<NativeFn>,
}

impl<'b, 'u> Binder<'b, 'u> {
    // ==========================================================================
    // Graph construction helpers
    // ==========================================================================

    pub(crate) fn alloc(&self, ty: TypeHash, kind: BoundKind<'b>) -> &'b BoundExpr<'b> {
        self.arena.alloc(BoundExpr { ty, kind })
    }

    pub(crate) fn alloc_slice(
        &self,
        exprs: &[&'b BoundExpr<'b>],
    ) -> &'b [&'b BoundExpr<'b>] {
        self.arena.alloc_slice_copy(exprs)
    }

    pub(crate) fn add_const(&mut self, value: Value) -> ConstId {
        self.consts.push(value);
        (self.consts.len() - 1) as ConstId
    }

    pub(crate) fn add_member(&mut self, member: MemberDesc) -> MemberId {
        self.members.push(member);
        (self.members.len() - 1) as MemberId
    }

    pub(crate) fn add_native(&mut self, f: NativeFn) -> NativeId {
        self.natives.push(f);
        (self.natives.len() - 1) as NativeId
    }

    /// Allocate a constant node.
    pub(crate) fn constant(&mut self, ty: TypeHash, value: Value) -> &'b BoundExpr<'b> {
        let id = self.add_const(value);
        self.alloc(ty, BoundKind::Constant(id))
    }

    /// The constant value behind a node, if it is a constant.
    pub(crate) fn const_value(&self, expr: &BoundExpr<'b>) -> Option<&Value> {
        match expr.kind {
            BoundKind::Constant(id) => self.consts.get(id as usize),
            _ => None,
        }
    }

    /// Whether this node is the bare null literal (before coercion).
    pub(crate) fn is_null_literal(&self, expr: &BoundExpr<'b>) -> bool {
        expr.ty == primitives::NULL
            && matches!(self.const_value(expr), Some(Value::Null))
    }

    // ==========================================================================
    // Dispatch
    // ==========================================================================

    /// Bind one node. Null-conditional chains opened inside stay open.
    pub fn bind_node(&mut self, node: &SyntaxNode) -> Result<&'b BoundExpr<'b>, BindError> {
        let kind = NodeKind::parse(&node.kind).ok_or_else(|| BindError::UnknownNodeKind {
            kind: node.kind.clone(),
            span: node.span,
        })?;
        trace!(kind = kind.as_str(), "binding node");
        match kind {
            NodeKind::Constant => constant::bind_constant(self, node),
            NodeKind::PropertyOrField => member::bind_property_or_field(self, node),
            NodeKind::Call => calls::bind_call(self, node),
            NodeKind::Invoke => calls::bind_invoke(self, node),
            NodeKind::Index => member::bind_index(self, node),
            NodeKind::ArrayLength => member::bind_array_length(self, node),
            NodeKind::Condition => condition::bind_condition(self, node),
            NodeKind::AndAlso => condition::bind_logical(self, node, true),
            NodeKind::OrElse => condition::bind_logical(self, node, false),
            NodeKind::Coalesce => condition::bind_coalesce(self, node),
            NodeKind::New => new::bind_new(self, node),
            NodeKind::NewArrayBounds => new::bind_new_array_bounds(self, node),
            NodeKind::NewArrayInit => new::bind_new_array_init(self, node),
            NodeKind::MemberInit => new::bind_member_init(self, node),
            NodeKind::ListInit => new::bind_list_init(self, node),
            NodeKind::Convert => convert::bind_convert(self, node, false),
            NodeKind::ConvertChecked => convert::bind_convert(self, node, true),
            NodeKind::TypeIs => convert::bind_type_is(self, node),
            NodeKind::TypeAs => convert::bind_type_as(self, node),
            NodeKind::TypeOf => convert::bind_type_of(self, node),
            NodeKind::Default => convert::bind_default(self, node),
            NodeKind::Lambda => lambda::bind_lambda(self, node),
            NodeKind::Parameter => lambda::bind_parameter(self, node),
            NodeKind::Quote => lambda::bind_quote(self, node),
            other => {
                if let Some(op) = BinaryOp::from_kind(other) {
                    binary::bind_binary(self, other, op, node)
                } else if let Some(op) = UnaryOp::from_kind(other) {
                    unary::bind_unary(self, other, op, node)
                } else {
                    Err(BindError::Invalid {
                        message: format!("node kind '{}' is not an expression", other.as_str()),
                        span: node.span,
                    })
                }
            }
        }
    }

    /// Bind a node consumed as an independent value: any null-conditional
    /// chain opened inside it is closed here with a guard wrapper.
    pub fn bind_guarded(&mut self, node: &SyntaxNode) -> Result<&'b BoundExpr<'b>, BindError> {
        let mark = self.null_targets.len();
        let expr = self.bind_node(node)?;
        Ok(self.close_null_chain(expr, mark))
    }

    /// Wrap `expr` in a null-propagation guard over the targets registered
    /// since `mark`, in registration order. No-op when none were.
    pub(crate) fn close_null_chain(
        &mut self,
        expr: &'b BoundExpr<'b>,
        mark: usize,
    ) -> &'b BoundExpr<'b> {
        if self.null_targets.len() <= mark {
            return expr;
        }
        let drained = self.null_targets.split_off(mark);
        let targets = self.arena.alloc_slice_copy(&drained);
        let ty = match self.universe.try_describe(expr.ty) {
            Some(desc) if !desc.accepts_null() => self.universe.nullable_of(expr.ty),
            _ => expr.ty,
        };
        self.alloc(ty, BoundKind::NullGuard { targets, body: expr })
    }

    // ==========================================================================
    // Shared lookups
    // ==========================================================================

    /// Resolve a type name against the universe.
    pub(crate) fn resolve_type(
        &self,
        name: &str,
        span: Option<Span>,
    ) -> Result<TypeHash, BindError> {
        self.universe
            .resolve_name(name)
            .ok_or_else(|| BindError::UnknownType {
                name: name.to_owned(),
                span,
            })
    }

    /// Name of a type for error messages.
    pub(crate) fn type_name(&self, ty: TypeHash) -> String {
        self.universe.name_of(ty)
    }

    /// Convenience: apply a conversion node.
    pub(crate) fn convert(
        &self,
        input: &'b BoundExpr<'b>,
        ty: TypeHash,
        conversion: Conversion,
        checked: bool,
    ) -> &'b BoundExpr<'b> {
        self.alloc(
            ty,
            BoundKind::Convert {
                input,
                conversion,
                checked,
            },
        )
    }
}

// ==========================================================================
// Required-attribute helpers
// ==========================================================================

pub(crate) fn req_node<'n>(
    node: &'n SyntaxNode,
    kind: NodeKind,
    attr: &'static str,
) -> Result<&'n SyntaxNode, BindError> {
    node.node_attr(attr).ok_or(BindError::MissingAttribute {
        kind: kind.as_str(),
        attr,
        span: node.span,
    })
}

pub(crate) fn req_nodes<'n>(
    node: &'n SyntaxNode,
    kind: NodeKind,
    attr: &'static str,
) -> Result<&'n [SyntaxNode], BindError> {
    node.nodes_attr(attr).ok_or(BindError::MissingAttribute {
        kind: kind.as_str(),
        attr,
        span: node.span,
    })
}

pub(crate) fn req_str<'n>(
    node: &'n SyntaxNode,
    kind: NodeKind,
    attr: &'static str,
) -> Result<&'n str, BindError> {
    node.str_attr(attr).ok_or(BindError::MissingAttribute {
        kind: kind.as_str(),
        attr,
        span: node.span,
    })
}
