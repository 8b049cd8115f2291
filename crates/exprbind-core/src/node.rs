//! The attributed syntax tree exchanged with collaborators.
//!
//! A [`SyntaxNode`] is an ordered, named-attribute record tagged with a node
//! kind string. Children are nodes, node lists, or primitive values. The
//! parser that produces trees and the formatter/packer that consume them are
//! external; this crate only fixes the shape and the closed kind vocabulary.
//!
//! Attribute order is preserved: object-initializer bindings, argument
//! lists, and similar ordered constructs rely on it.

use crate::span::Span;

/// An attribute value: a child node, a node list, or a primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Node(Box<SyntaxNode>),
    Nodes(Vec<SyntaxNode>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// One node of the input syntax tree.
///
/// The `kind` tag is a string so that trees can round-trip through generic
/// key-value serializers without this crate in the loop; the binder rejects
/// kinds outside [`NodeKind`]'s vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: String,
    pub attrs: Vec<(String, AttrValue)>,
    pub span: Option<Span>,
}

impl SyntaxNode {
    pub fn new(kind: impl Into<String>) -> Self {
        SyntaxNode {
            kind: kind.into(),
            attrs: Vec::new(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Append an attribute, preserving order.
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    /// Append a child-node attribute.
    pub fn with_node(self, name: impl Into<String>, node: SyntaxNode) -> Self {
        self.with(name, AttrValue::Node(Box::new(node)))
    }

    /// Append a node-list attribute.
    pub fn with_nodes(self, name: impl Into<String>, nodes: Vec<SyntaxNode>) -> Self {
        self.with(name, AttrValue::Nodes(nodes))
    }

    pub fn with_str(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, AttrValue::Str(value.into()))
    }

    pub fn with_int(self, name: impl Into<String>, value: i64) -> Self {
        self.with(name, AttrValue::Int(value))
    }

    pub fn with_bool(self, name: impl Into<String>, value: bool) -> Self {
        self.with(name, AttrValue::Bool(value))
    }

    /// First attribute with this name, if present.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    pub fn node_attr(&self, name: &str) -> Option<&SyntaxNode> {
        match self.attr(name) {
            Some(AttrValue::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn nodes_attr(&self, name: &str) -> Option<&[SyntaxNode]> {
        match self.attr(name) {
            Some(AttrValue::Nodes(ns)) => Some(ns),
            _ => None,
        }
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        match self.attr(name) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bool_attr(&self, name: &str) -> Option<bool> {
        match self.attr(name) {
            Some(AttrValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// The closed node-kind vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Constant,
    PropertyOrField,
    Call,
    Invoke,
    Index,
    Condition,
    New,
    NewArrayBounds,
    NewArrayInit,
    MemberInit,
    ListInit,
    Convert,
    ConvertChecked,
    TypeIs,
    TypeAs,
    Negate,
    Not,
    UnaryPlus,
    Complement,
    ArrayLength,
    Default,
    TypeOf,
    Lambda,
    Parameter,
    Quote,
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
    AndAlso,
    OrElse,
    Coalesce,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl NodeKind {
    /// Parse a kind tag. Unknown tags are a hard binding error upstream.
    pub fn parse(kind: &str) -> Option<NodeKind> {
        Some(match kind {
            "Constant" => NodeKind::Constant,
            "PropertyOrField" => NodeKind::PropertyOrField,
            "Call" => NodeKind::Call,
            "Invoke" => NodeKind::Invoke,
            "Index" => NodeKind::Index,
            "Condition" => NodeKind::Condition,
            "New" => NodeKind::New,
            "NewArrayBounds" => NodeKind::NewArrayBounds,
            "NewArrayInit" => NodeKind::NewArrayInit,
            "MemberInit" => NodeKind::MemberInit,
            "ListInit" => NodeKind::ListInit,
            "Convert" => NodeKind::Convert,
            "ConvertChecked" => NodeKind::ConvertChecked,
            "TypeIs" => NodeKind::TypeIs,
            "TypeAs" => NodeKind::TypeAs,
            "Negate" => NodeKind::Negate,
            "Not" => NodeKind::Not,
            "UnaryPlus" => NodeKind::UnaryPlus,
            "Complement" => NodeKind::Complement,
            "ArrayLength" => NodeKind::ArrayLength,
            "Default" => NodeKind::Default,
            "TypeOf" => NodeKind::TypeOf,
            "Lambda" => NodeKind::Lambda,
            "Parameter" => NodeKind::Parameter,
            "Quote" => NodeKind::Quote,
            "Add" => NodeKind::Add,
            "Subtract" => NodeKind::Subtract,
            "Multiply" => NodeKind::Multiply,
            "Divide" => NodeKind::Divide,
            "Modulo" => NodeKind::Modulo,
            "Power" => NodeKind::Power,
            "LeftShift" => NodeKind::LeftShift,
            "RightShift" => NodeKind::RightShift,
            "And" => NodeKind::And,
            "Or" => NodeKind::Or,
            "ExclusiveOr" => NodeKind::ExclusiveOr,
            "AndAlso" => NodeKind::AndAlso,
            "OrElse" => NodeKind::OrElse,
            "Coalesce" => NodeKind::Coalesce,
            "Equal" => NodeKind::Equal,
            "NotEqual" => NodeKind::NotEqual,
            "GreaterThan" => NodeKind::GreaterThan,
            "GreaterThanOrEqual" => NodeKind::GreaterThanOrEqual,
            "LessThan" => NodeKind::LessThan,
            "LessThanOrEqual" => NodeKind::LessThanOrEqual,
            _ => return None,
        })
    }

    /// The canonical kind tag.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Constant => "Constant",
            NodeKind::PropertyOrField => "PropertyOrField",
            NodeKind::Call => "Call",
            NodeKind::Invoke => "Invoke",
            NodeKind::Index => "Index",
            NodeKind::Condition => "Condition",
            NodeKind::New => "New",
            NodeKind::NewArrayBounds => "NewArrayBounds",
            NodeKind::NewArrayInit => "NewArrayInit",
            NodeKind::MemberInit => "MemberInit",
            NodeKind::ListInit => "ListInit",
            NodeKind::Convert => "Convert",
            NodeKind::ConvertChecked => "ConvertChecked",
            NodeKind::TypeIs => "TypeIs",
            NodeKind::TypeAs => "TypeAs",
            NodeKind::Negate => "Negate",
            NodeKind::Not => "Not",
            NodeKind::UnaryPlus => "UnaryPlus",
            NodeKind::Complement => "Complement",
            NodeKind::ArrayLength => "ArrayLength",
            NodeKind::Default => "Default",
            NodeKind::TypeOf => "TypeOf",
            NodeKind::Lambda => "Lambda",
            NodeKind::Parameter => "Parameter",
            NodeKind::Quote => "Quote",
            NodeKind::Add => "Add",
            NodeKind::Subtract => "Subtract",
            NodeKind::Multiply => "Multiply",
            NodeKind::Divide => "Divide",
            NodeKind::Modulo => "Modulo",
            NodeKind::Power => "Power",
            NodeKind::LeftShift => "LeftShift",
            NodeKind::RightShift => "RightShift",
            NodeKind::And => "And",
            NodeKind::Or => "Or",
            NodeKind::ExclusiveOr => "ExclusiveOr",
            NodeKind::AndAlso => "AndAlso",
            NodeKind::OrElse => "OrElse",
            NodeKind::Coalesce => "Coalesce",
            NodeKind::Equal => "Equal",
            NodeKind::NotEqual => "NotEqual",
            NodeKind::GreaterThan => "GreaterThan",
            NodeKind::GreaterThanOrEqual => "GreaterThanOrEqual",
            NodeKind::LessThan => "LessThan",
            NodeKind::LessThanOrEqual => "LessThanOrEqual",
        }
    }
}
