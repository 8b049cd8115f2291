//! Error types for registration, binding, and evaluation.
//!
//! Errors are split by phase, mirroring how callers handle them:
//!
//! ```text
//! RegistrationError - building the type universe
//! BindError         - semantic analysis of a syntax tree
//! EvalError         - evaluating a compiled expression
//! NativeError       - raised inside host-supplied member callbacks
//! ```
//!
//! Binding errors are structured: each variant carries what was being bound
//! and, where available, the source span of the offending node. Evaluation
//! errors deliberately mirror what equivalent hand-written code would raise
//! (null dereference, invalid cast, index out of range, divide by zero,
//! overflow); none of them are retried internally.

use thiserror::Error;

use crate::span::{MaybeSpan, Span};

// ============================================================================
// Registration
// ============================================================================

/// Errors raised while populating a type universe.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A type with this name/identity is already registered.
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    /// A base type was referenced before being described.
    ///
    /// Descriptions are built bottom-up: the base must exist first.
    #[error("base type of '{name}' is not registered")]
    UnknownBase { name: String },

    /// An interface listed on a class is not registered.
    #[error("interface implemented by '{name}' is not registered")]
    UnknownInterface { name: String },

    /// The identity was never registered and no provider could describe it.
    #[error("no description available for type {hash:?}")]
    UnknownType { hash: crate::TypeHash },
}

// ============================================================================
// Binding
// ============================================================================

/// Errors raised during semantic analysis.
///
/// Every variant that originates at a specific node carries its span (when
/// the input tree had one). `cause` chains preserve the inner failure that
/// made an outer construct unbindable.
#[derive(Debug, Error)]
pub enum BindError {
    /// The node kind string is not in the closed vocabulary.
    #[error("unknown node kind '{kind}'{}", MaybeSpan(.span))]
    UnknownNodeKind { kind: String, span: Option<Span> },

    /// A required attribute is absent from the node.
    #[error("node '{kind}' is missing required attribute '{attr}'{}", MaybeSpan(.span))]
    MissingAttribute {
        kind: &'static str,
        attr: &'static str,
        span: Option<Span>,
    },

    /// An attribute is present but has the wrong shape.
    #[error("attribute '{attr}' of node '{kind}' {detail}{}", MaybeSpan(.span))]
    BadAttribute {
        kind: &'static str,
        attr: &'static str,
        detail: String,
        span: Option<Span>,
    },

    /// A type name could not be resolved against the universe.
    #[error("unknown type '{name}'{}", MaybeSpan(.span))]
    UnknownType { name: String, span: Option<Span> },

    /// No member with this name exists on the target type.
    #[error("type '{type_name}' has no member '{member}'{}", MaybeSpan(.span))]
    UnknownMember {
        type_name: String,
        member: String,
        span: Option<Span>,
    },

    /// Every candidate was tried and rejected.
    ///
    /// Reported only after the full candidate list has been scored.
    #[error("no overload of '{name}' accepts ({args}){}", MaybeSpan(.span))]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Option<Span>,
    },

    /// Operand or conversion target types are incompatible.
    #[error("{message}{}", MaybeSpan(.span))]
    TypeMismatch { message: String, span: Option<Span> },

    /// The numeric promotion rules reject this operand pairing.
    #[error("{message}{}", MaybeSpan(.span))]
    NumericPromotion { message: String, span: Option<Span> },

    /// Null-conditional access through a type (static) target.
    #[error("null-conditional access is not valid on a static target{}", MaybeSpan(.span))]
    NullConditionalOnStatic { span: Option<Span> },

    /// A construct the binder cannot express in this position.
    #[error("{message}{}", MaybeSpan(.span))]
    Invalid { message: String, span: Option<Span> },

    /// A nested bind failed while analyzing an enclosing construct.
    #[error("while binding {what}{}", MaybeSpan(.span))]
    Context {
        what: &'static str,
        span: Option<Span>,
        #[source]
        cause: Box<BindError>,
    },
}

impl BindError {
    /// The span of the originating node, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            BindError::UnknownNodeKind { span, .. }
            | BindError::MissingAttribute { span, .. }
            | BindError::BadAttribute { span, .. }
            | BindError::UnknownType { span, .. }
            | BindError::UnknownMember { span, .. }
            | BindError::NoMatchingOverload { span, .. }
            | BindError::TypeMismatch { span, .. }
            | BindError::NumericPromotion { span, .. }
            | BindError::NullConditionalOnStatic { span }
            | BindError::Invalid { span, .. }
            | BindError::Context { span, .. } => *span,
        }
    }

    /// Wrap this error as the cause of an enclosing construct.
    pub fn context(self, what: &'static str, span: Option<Span>) -> BindError {
        BindError::Context {
            what,
            span: span.or_else(|| self.span()),
            cause: Box::new(self),
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Errors raised while evaluating a compiled expression.
///
/// These match what equivalent hand-written code would raise for the same
/// operation, and abort the evaluation of the current call.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Member access or unboxing through a null value.
    #[error("null value dereferenced while evaluating {what}")]
    NullDereference { what: String },

    /// A runtime type check failed during unboxing.
    #[error("cannot cast value of type '{from}' to '{to}'")]
    InvalidCast { from: String, to: String },

    /// Array index outside the bounds of its dimension.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Integer or decimal division/modulo by zero.
    #[error("division by zero")]
    DivideByZero,

    /// Arithmetic or checked conversion overflowed the target type.
    #[error("arithmetic operation overflowed in {op}")]
    Overflow { op: String },

    /// The evaluator was invoked with the wrong number of arguments.
    #[error("expression expects {expected} argument(s), got {got}")]
    ArgumentCount { expected: usize, got: usize },

    /// A value had an unexpected runtime shape.
    ///
    /// Indicates a host callback returning a value outside its declared
    /// result type; bound graphs never produce this on their own.
    #[error("unexpected value while evaluating {what}: expected {expected}, got {got}")]
    UnexpectedValue {
        what: String,
        expected: String,
        got: String,
    },

    /// A host-supplied member implementation failed.
    #[error("native callback failed: {0}")]
    Native(#[from] NativeError),
}

// ============================================================================
// Native callbacks
// ============================================================================

/// Failure raised inside a host-supplied member implementation.
///
/// Hosts report whatever went wrong; the error is carried opaquely through
/// the evaluator to the caller.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct NativeError(#[from] pub anyhow::Error);

impl NativeError {
    /// Build a native error from a message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        NativeError(anyhow::anyhow!("{message}"))
    }
}
