//! Binary and unary operator classification.
//!
//! `AndAlso`, `OrElse`, and `Coalesce` are not operators here: they bind to
//! dedicated short-circuit forms rather than operand promotion.

use crate::node::NodeKind;

/// An eagerly-evaluated binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    And,
    Or,
    ExclusiveOr,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl BinaryOp {
    /// Operator for a node kind, if the kind is a binary operator.
    pub fn from_kind(kind: NodeKind) -> Option<BinaryOp> {
        Some(match kind {
            NodeKind::Add => BinaryOp::Add,
            NodeKind::Subtract => BinaryOp::Subtract,
            NodeKind::Multiply => BinaryOp::Multiply,
            NodeKind::Divide => BinaryOp::Divide,
            NodeKind::Modulo => BinaryOp::Modulo,
            NodeKind::Power => BinaryOp::Power,
            NodeKind::LeftShift => BinaryOp::LeftShift,
            NodeKind::RightShift => BinaryOp::RightShift,
            NodeKind::And => BinaryOp::And,
            NodeKind::Or => BinaryOp::Or,
            NodeKind::ExclusiveOr => BinaryOp::ExclusiveOr,
            NodeKind::Equal => BinaryOp::Equal,
            NodeKind::NotEqual => BinaryOp::NotEqual,
            NodeKind::GreaterThan => BinaryOp::GreaterThan,
            NodeKind::GreaterThanOrEqual => BinaryOp::GreaterThanOrEqual,
            NodeKind::LessThan => BinaryOp::LessThan,
            NodeKind::LessThanOrEqual => BinaryOp::LessThanOrEqual,
            _ => return None,
        })
    }

    /// Comparison operators produce bool regardless of operand rank.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
        )
    }

    /// Equality subset of the comparisons.
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    /// Bitwise/shift operators, valid on integer ranks only.
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            BinaryOp::LeftShift
                | BinaryOp::RightShift
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::ExclusiveOr
        )
    }

    /// Shift operators promote the left operand alone.
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::LeftShift | BinaryOp::RightShift)
    }

    /// Symbol for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::ExclusiveOr => "^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
    UnaryPlus,
    Complement,
}

impl UnaryOp {
    pub fn from_kind(kind: NodeKind) -> Option<UnaryOp> {
        Some(match kind {
            NodeKind::Negate => UnaryOp::Negate,
            NodeKind::Not => UnaryOp::Not,
            NodeKind::UnaryPlus => UnaryOp::UnaryPlus,
            NodeKind::Complement => UnaryOp::Complement,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::UnaryPlus => "+",
            UnaryOp::Complement => "~",
        }
    }
}
