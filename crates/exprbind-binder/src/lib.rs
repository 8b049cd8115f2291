//! Semantic analysis: syntax tree in, typed bound graph out.
//!
//! [`bind`] walks an attributed [`SyntaxNode`] tree top-down against a
//! [`TypeUniverse`], resolving every member reference, scoring overloads,
//! applying numeric/nullable/enum promotion, and wiring null-propagation
//! guards. The result is a [`BoundProgram`]: an arena-allocated typed graph
//! plus the constant/member/operator side tables the execution engine
//! lowers from.
//!
//! ## Modules
//!
//! - [`bound`]: the bound expression graph and its side tables
//! - [`context`]: the declared signature and parameter scoping
//! - [`promote`]: numeric promotion tables
//! - `coerce`: the graded conversion ladder
//! - `overload`: candidate scoring and selection
//! - `expr`: one binder per node kind behind a single dispatch

pub mod bound;
pub mod context;
pub mod promote;

mod coerce;
mod expr;
mod overload;

use bumpalo::Bump;
use tracing::debug;

use exprbind_core::{BindError, SyntaxNode};
use exprbind_registry::TypeUniverse;

pub use bound::{
    BinaryMode, BoundExpr, BoundKind, BoundProgram, ConstId, Conversion, MemberId, NativeId,
    UnaryMode,
};
pub use context::Signature;
pub use expr::Binder;

use context::Scopes;

/// Bind a syntax tree against a type universe.
///
/// The graph is allocated in `arena`; the returned program borrows it.
/// Binding is single-threaded and synchronous; the universe is only read.
pub fn bind<'b>(
    universe: &TypeUniverse,
    arena: &'b Bump,
    node: &SyntaxNode,
    signature: &Signature,
) -> Result<BoundProgram<'b>, BindError> {
    let (scopes, this_slot) = Scopes::new(signature);
    let mut binder = Binder {
        arena,
        universe,
        scopes,
        this_slot,
        null_targets: Vec::new(),
        consts: Vec::new(),
        members: Vec::new(),
        natives: Vec::new(),
    };

    let mut root = binder.bind_guarded(node)?;
    if let Some(expected) = signature.result {
        root = binder.coerce_or_err(root, expected, false, node.span, "expression result")?;
    }

    let slot_count = binder.scopes.slot_count();
    debug!(
        slots = slot_count,
        consts = binder.consts.len(),
        members = binder.members.len(),
        "bound expression"
    );
    Ok(BoundProgram {
        root,
        param_count: signature.arg_count(),
        slot_count,
        consts: binder.consts,
        members: binder.members,
        natives: binder.natives,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, bind_err, bind_expr};
    use exprbind_core::{AttrValue, primitives};

    fn int(v: i64) -> SyntaxNode {
        SyntaxNode::new("Constant").with_int("value", v)
    }

    fn typed(v: i64, ty: &str) -> SyntaxNode {
        SyntaxNode::new("Constant").with_int("value", v).with_str("type", ty)
    }

    fn binary(kind: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
        SyntaxNode::new(kind)
            .with_node("left", left)
            .with_node("right", right)
    }

    #[test]
    fn unknown_kind_is_a_hard_error() {
        let err = bind_err(SyntaxNode::new("Assign"));
        assert!(matches!(err, BindError::UnknownNodeKind { .. }));
    }

    #[test]
    fn int_plus_long_binds_at_i64() {
        let (program, _) = bind_expr(binary("Add", int(2), typed(3, "i64")));
        assert_eq!(program.root.ty, primitives::I64);
        match program.root.kind {
            BoundKind::Binary { mode: BinaryMode::Numeric { rank, lifted }, .. } => {
                assert_eq!(rank, exprbind_core::NumericRank::I64);
                assert!(!lifted);
            }
            other => panic!("expected numeric binary, got {other:?}"),
        }
    }

    #[test]
    fn byte_plus_byte_widens_to_i32() {
        let (program, _) = bind_expr(binary("Add", typed(1, "u8"), typed(2, "u8")));
        assert_eq!(program.root.ty, primitives::I32);
    }

    #[test]
    fn add_with_string_operand_is_concatenation() {
        let one_plus_x = binary(
            "Add",
            int(1),
            SyntaxNode::new("Constant").with("value", AttrValue::Str("x".into())),
        );
        let (program, _) = bind_expr(one_plus_x);
        assert_eq!(program.root.ty, primitives::STRING);
        assert!(matches!(
            program.root.kind,
            BoundKind::Binary { mode: BinaryMode::Concat, .. }
        ));
    }

    #[test]
    fn decimal_and_float_refuse_to_mix() {
        let err = bind_err(binary(
            "Add",
            typed(1, "decimal"),
            SyntaxNode::new("Constant").with("value", AttrValue::Float(1.5)),
        ));
        assert!(matches!(err, BindError::NumericPromotion { .. }));
    }

    #[test]
    fn signed_with_u64_is_rejected() {
        let err = bind_err(binary("Add", typed(1, "i32"), typed(2, "u64")));
        assert!(matches!(err, BindError::NumericPromotion { .. }));
    }

    #[test]
    fn signed_with_u32_promotes_to_i64() {
        let (program, _) = bind_expr(binary("Add", typed(1, "i32"), typed(2, "u32")));
        assert_eq!(program.root.ty, primitives::I64);
    }

    #[test]
    fn enum_plus_int_keeps_the_enum_type() {
        let green = SyntaxNode::new("PropertyOrField")
            .with_str("targetType", "Color")
            .with_str("member", "Green");
        let (program, universe) = bind_expr(binary("Add", green, int(1)));
        assert_eq!(program.root.ty, universe.resolve_name("Color").unwrap());
        assert!(matches!(
            program.root.kind,
            BoundKind::Binary { mode: BinaryMode::EnumArith { .. }, .. }
        ));
    }

    #[test]
    fn overload_selection_prefers_exact_match() {
        let call = SyntaxNode::new("Call")
            .with_str("targetType", "Host")
            .with_str("method", "pick")
            .with_nodes("arguments", vec![int(1)]);
        let (program, _) = bind_expr(call);
        match program.root.kind {
            BoundKind::Call { member, .. } => {
                let chosen = &program.members[member as usize];
                assert_eq!(chosen.params[0].param_type, primitives::I32);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn binding_is_deterministic() {
        let tree = binary("Multiply", int(6), typed(7, "i64"));
        let (a, _) = bind_expr(tree.clone());
        let (b, _) = bind_expr(tree);
        assert_eq!(format!("{:?}", a.root), format!("{:?}", b.root));
        assert_eq!(a.consts, b.consts);
    }

    #[test]
    fn null_conditional_chain_is_guarded_once() {
        // h?.size: the chain closes at the root with a single guard over
        // the target, and the result lifts to i32?.
        let universe = test_support::test_universe();
        let arena = Bump::new();
        let host = universe.resolve_name("Host").unwrap();
        let sig = Signature::new().param("h", host);
        let access = SyntaxNode::new("PropertyOrField")
            .with_node("expression", SyntaxNode::new("Parameter").with_str("name", "h"))
            .with_str("member", "size")
            .with_bool("nullConditional", true);
        let program = bind(&universe, &arena, &access, &sig).unwrap();
        assert_eq!(program.root.ty, universe.nullable_of(primitives::I32));
        match program.root.kind {
            BoundKind::NullGuard { targets, body } => {
                assert_eq!(targets.len(), 1);
                assert!(matches!(body.kind, BoundKind::Field { .. }));
            }
            other => panic!("expected null guard at the root, got {other:?}"),
        }
    }

    #[test]
    fn null_conditional_on_static_target_is_rejected() {
        let err = bind_err(
            SyntaxNode::new("PropertyOrField")
                .with_str("targetType", "Color")
                .with_str("member", "Green")
                .with_bool("nullConditional", true),
        );
        assert!(matches!(err, BindError::NullConditionalOnStatic { .. }));
    }
}
