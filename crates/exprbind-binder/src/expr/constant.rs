//! Constant binding.
//!
//! A `Constant` node carries a primitive `value` attribute and an optional
//! `type` attribute naming the declared type. Without a type annotation,
//! integers land on the narrowest word rank that holds them, floats on
//! `f64`. With one, the literal is coerced in place at bind time.

use exprbind_core::{AttrValue, BindError, NodeKind, SyntaxNode, Value, primitives};

use crate::bound::BoundExpr;
use crate::expr::Binder;

pub(crate) fn bind_constant<'b>(
    binder: &mut Binder<'b, '_>,
    node: &SyntaxNode,
) -> Result<&'b BoundExpr<'b>, BindError> {
    let raw = node.attr("value").ok_or(BindError::MissingAttribute {
        kind: NodeKind::Constant.as_str(),
        attr: "value",
        span: node.span,
    })?;

    let (ty, value) = match raw {
        AttrValue::Null => (primitives::NULL, Value::Null),
        AttrValue::Bool(b) => (primitives::BOOL, Value::Bool(*b)),
        AttrValue::Int(i) => match i32::try_from(*i) {
            Ok(narrow) => (primitives::I32, Value::I32(narrow)),
            Err(_) => (primitives::I64, Value::I64(*i)),
        },
        AttrValue::Float(f) => (primitives::F64, Value::F64(*f)),
        AttrValue::Str(s) => (primitives::STRING, Value::str(s)),
        AttrValue::Node(_) | AttrValue::Nodes(_) => {
            return Err(BindError::BadAttribute {
                kind: NodeKind::Constant.as_str(),
                attr: "value",
                detail: "must be a primitive value".into(),
                span: node.span,
            });
        }
    };

    let literal = binder.constant(ty, value);

    match node.str_attr("type") {
        None => Ok(literal),
        Some(type_name) => {
            let target = binder.resolve_type(type_name, node.span)?;
            if target == primitives::DECIMAL {
                // Decimal literals arrive as text or integers; parse rather
                // than round-trip through binary floating point.
                if let Some(value) = parse_decimal(raw) {
                    return Ok(binder.constant(primitives::DECIMAL, value));
                }
            }
            binder.coerce_or_err(literal, target, true, node.span, "constant literal")
        }
    }
}

fn parse_decimal(raw: &AttrValue) -> Option<Value> {
    use rust_decimal::Decimal;
    use std::str::FromStr;
    match raw {
        AttrValue::Str(s) => Decimal::from_str(s.trim()).ok().map(Value::Decimal),
        AttrValue::Int(i) => Some(Value::Decimal(Decimal::from(*i))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bind_expr;
    use exprbind_core::SyntaxNode;

    #[test]
    fn untyped_integer_is_i32_when_it_fits() {
        let (program, _) = bind_expr(SyntaxNode::new("Constant").with_int("value", 2));
        assert_eq!(program.root.ty, primitives::I32);
    }

    #[test]
    fn wide_integer_is_i64() {
        let (program, _) = bind_expr(
            SyntaxNode::new("Constant").with_int("value", i64::from(i32::MAX) + 1),
        );
        assert_eq!(program.root.ty, primitives::I64);
    }

    #[test]
    fn typed_literal_folds_in_place() {
        let (program, _) = bind_expr(
            SyntaxNode::new("Constant")
                .with_int("value", 3)
                .with_str("type", "i64"),
        );
        assert_eq!(program.root.ty, primitives::I64);
        assert_eq!(program.consts.last(), Some(&Value::I64(3)));
    }

    #[test]
    fn decimal_literal_parses_from_text() {
        let (program, _) = bind_expr(
            SyntaxNode::new("Constant")
                .with_str("value", "12.50")
                .with_str("type", "decimal"),
        );
        assert_eq!(program.root.ty, primitives::DECIMAL);
    }

    #[test]
    fn missing_value_is_a_hard_error() {
        let err = crate::test_support::bind_err(SyntaxNode::new("Constant"));
        assert!(matches!(err, BindError::MissingAttribute { attr: "value", .. }));
    }
}
