//! Type and member metadata cache.
//!
//! The registry crate holds the supplied universe of known types and
//! members: normalized [`TypeDesc`]/[`MemberDesc`] descriptions, the
//! registration builders hosts use to assemble them, the lazy
//! [`TypeProvider`] capability, and the graded [`ConversionTable`] populated
//! as types are described.

pub mod builder;
pub mod conversion_table;
pub mod desc;
pub mod universe;

pub use builder::{ClassBuilder, EnumBuilder, InterfaceBuilder};
pub use conversion_table::{ConversionDesc, ConversionTable, quality};
pub use desc::{
    BinaryOperatorDesc, ConversionOp, MemberDesc, MemberFlags, MemberKind, OperatorTables,
    ParamDesc, TypeDesc, TypeKind,
};
pub use universe::{TypeProvider, TypeUniverse};
