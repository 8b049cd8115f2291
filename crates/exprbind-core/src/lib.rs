//! Core data model for the expression binding engine.
//!
//! This crate holds everything the registry, binder, and execution engine
//! share: source spans, phase-split error types, deterministic type
//! identity, the primitive type constants, the dynamic [`Value`] model, the
//! attributed syntax-tree shape with its closed node-kind vocabulary, the
//! operator enums, and the [`NativeFn`] bridge to host member
//! implementations.

pub mod error;
pub mod native_fn;
pub mod node;
pub mod operator;
pub mod primitives;
pub mod span;
pub mod type_hash;
pub mod value;

pub use error::{BindError, EvalError, NativeError, RegistrationError};
pub use native_fn::{NativeFn, NativeResult};
pub use node::{AttrValue, NodeKind, SyntaxNode};
pub use operator::{BinaryOp, UnaryOp};
pub use primitives::NumericRank;
pub use span::Span;
pub use type_hash::TypeHash;
pub use value::{ArrayValue, Value};
