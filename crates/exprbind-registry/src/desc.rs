//! Type and member descriptions.
//!
//! A [`TypeDesc`] is the normalized, reflected shape of one type: members
//! grouped by name, indexers, constructors, and the operator tables. It is
//! built once per type and cached for the universe lifetime. A
//! [`MemberDesc`] is the uniform wrapper over a field, property, method,
//! constructor, or indexer: the binder scores calls against its parameter
//! list and the engine invokes its [`NativeFn`] handle.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use exprbind_core::{BinaryOp, NativeFn, NumericRank, TypeHash, Value, primitives};

bitflags! {
    /// Traits of a member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberFlags: u8 {
        /// Accessed through the type, not an instance.
        const STATIC = 1 << 0;
        /// No setter; member-initializer bindings reject it.
        const READ_ONLY = 1 << 1;
    }
}

/// What sort of member a [`MemberDesc`] wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    Constructor,
    Indexer,
}

/// One declared parameter of a member.
#[derive(Debug, Clone)]
pub struct ParamDesc {
    pub name: String,
    pub param_type: TypeHash,
    /// Filled in when the call site omits the argument.
    pub default: Option<Value>,
}

impl ParamDesc {
    pub fn new(name: impl Into<String>, param_type: TypeHash) -> Self {
        ParamDesc {
            name: name.into(),
            param_type,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, param_type: TypeHash, default: Value) -> Self {
        ParamDesc {
            name: name.into(),
            param_type,
            default: Some(default),
        }
    }
}

/// Uniform description of a field, property, method, constructor, or
/// indexer.
#[derive(Debug, Clone)]
pub struct MemberDesc {
    pub name: String,
    pub kind: MemberKind,
    pub flags: MemberFlags,
    /// The type this member is declared on.
    pub declaring: TypeHash,
    pub params: Vec<ParamDesc>,
    /// Result type; constructors report their declaring type.
    pub result: TypeHash,
    /// Getter/invoker handle.
    pub invoke: NativeFn,
    /// Setter handle for writable fields/properties.
    pub set: Option<NativeFn>,
}

impl MemberDesc {
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    /// Data members take no call arguments.
    pub fn is_data(&self) -> bool {
        matches!(self.kind, MemberKind::Field | MemberKind::Property)
    }

    /// Number of parameters without a default.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    /// Whether an argument count can possibly satisfy this member.
    pub fn arity_accepts(&self, n: usize) -> bool {
        n >= self.required_params() && n <= self.params.len()
    }
}

/// A user-declared conversion operator on a type.
///
/// Direction is given by which table the operator sits in; `other` is the
/// non-declaring side of the conversion.
#[derive(Debug, Clone)]
pub struct ConversionOp {
    pub other: TypeHash,
    pub invoke: NativeFn,
}

/// A user-declared binary operator overload.
#[derive(Debug, Clone)]
pub struct BinaryOperatorDesc {
    pub op: BinaryOp,
    pub lhs: TypeHash,
    pub rhs: TypeHash,
    pub result: TypeHash,
    pub invoke: NativeFn,
}

/// The six operator-category tables of a type description.
#[derive(Debug, Clone, Default)]
pub struct OperatorTables {
    /// `self -> other`, usable implicitly.
    pub implicit_to: Vec<ConversionOp>,
    /// `self -> other`, cast-only.
    pub explicit_to: Vec<ConversionOp>,
    /// `other -> self`, usable implicitly.
    pub implicit_from: Vec<ConversionOp>,
    /// `other -> self`, cast-only.
    pub explicit_from: Vec<ConversionOp>,
    /// Arithmetic/bitwise operator overloads.
    pub arithmetic: Vec<BinaryOperatorDesc>,
    /// Comparison operator overloads.
    pub comparison: Vec<BinaryOperatorDesc>,
}

impl OperatorTables {
    pub fn is_empty(&self) -> bool {
        self.implicit_to.is_empty()
            && self.explicit_to.is_empty()
            && self.implicit_from.is_empty()
            && self.explicit_from.is_empty()
            && self.arithmetic.is_empty()
            && self.comparison.is_empty()
    }

    /// Binary overloads for one operator, comparisons and arithmetic alike.
    pub fn binary_overloads(&self, op: BinaryOp) -> impl Iterator<Item = &BinaryOperatorDesc> {
        let table = if op.is_comparison() {
            &self.comparison
        } else {
            &self.arithmetic
        };
        table.iter().filter(move |d| d.op == op)
    }
}

/// Structural classification of a type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    /// The type of the bare `null` literal.
    Null,
    Bool,
    Numeric(NumericRank),
    Str,
    /// Root of the reference hierarchy.
    Object,
    /// The type of type literals.
    TypeLiteral,
    Enum {
        underlying: NumericRank,
        /// Declared values in declaration order.
        values: Vec<(String, i64)>,
    },
    Class {
        base: Option<TypeHash>,
        interfaces: Vec<TypeHash>,
    },
    Interface,
    Nullable {
        underlying: TypeHash,
    },
    Array {
        elem: TypeHash,
        rank: u32,
    },
    Lambda {
        params: Vec<TypeHash>,
        result: TypeHash,
    },
}

/// The cached description of one type.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    pub hash: TypeHash,
    pub name: String,
    pub kind: TypeKind,
    /// Members grouped by name, declaration order preserved per group.
    pub members: FxHashMap<String, Vec<MemberDesc>>,
    pub indexers: Vec<MemberDesc>,
    pub constructors: Vec<MemberDesc>,
    pub operators: OperatorTables,
}

impl TypeDesc {
    /// A description with no members, named after its hash source.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        Self::with_hash(TypeHash::from_name(&name), name, kind)
    }

    /// A description with an explicit identity (primitives, derived types).
    pub fn with_hash(hash: TypeHash, name: impl Into<String>, kind: TypeKind) -> Self {
        TypeDesc {
            hash,
            name: name.into(),
            kind,
            members: FxHashMap::default(),
            indexers: Vec::new(),
            constructors: Vec::new(),
            operators: OperatorTables::default(),
        }
    }

    /// Members declared on this type under the given name.
    pub fn members_named(&self, name: &str) -> &[MemberDesc] {
        self.members.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn base(&self) -> Option<TypeHash> {
        match &self.kind {
            TypeKind::Class { base, .. } => *base,
            // Everything except the root and the null type sits under object.
            TypeKind::Void | TypeKind::Null | TypeKind::Object => None,
            _ => Some(primitives::OBJECT),
        }
    }

    pub fn interfaces(&self) -> &[TypeHash] {
        match &self.kind {
            TypeKind::Class { interfaces, .. } => interfaces,
            _ => &[],
        }
    }

    /// Reference types admit null without a nullable wrapper.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Str
                | TypeKind::Object
                | TypeKind::Class { .. }
                | TypeKind::Interface
                | TypeKind::Array { .. }
                | TypeKind::Lambda { .. }
                | TypeKind::Null
        )
    }

    /// Whether a null value can inhabit this type.
    pub fn accepts_null(&self) -> bool {
        self.is_reference() || matches!(self.kind, TypeKind::Nullable { .. })
    }

    pub fn nullable_underlying(&self) -> Option<TypeHash> {
        match &self.kind {
            TypeKind::Nullable { underlying } => Some(*underlying),
            _ => None,
        }
    }

    pub fn enum_underlying(&self) -> Option<NumericRank> {
        match &self.kind {
            TypeKind::Enum { underlying, .. } => Some(*underlying),
            _ => None,
        }
    }

    /// Raw value of a declared enum member.
    pub fn enum_value(&self, name: &str) -> Option<i64> {
        match &self.kind {
            TypeKind::Enum { values, .. } => values
                .iter()
                .find_map(|(n, v)| (n == name).then_some(*v)),
            _ => None,
        }
    }

    /// The default value of this type (zero, false, or null).
    pub fn default_value(&self) -> Value {
        match &self.kind {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Numeric(rank) => zero_of(*rank),
            TypeKind::Enum { .. } => Value::Enum {
                ty: self.hash,
                raw: 0,
            },
            _ => Value::Null,
        }
    }
}

fn zero_of(rank: NumericRank) -> Value {
    match rank {
        NumericRank::I8 => Value::I8(0),
        NumericRank::U8 => Value::U8(0),
        NumericRank::I16 => Value::I16(0),
        NumericRank::U16 => Value::U16(0),
        NumericRank::I32 => Value::I32(0),
        NumericRank::U32 => Value::U32(0),
        NumericRank::I64 => Value::I64(0),
        NumericRank::U64 => Value::U64(0),
        NumericRank::F32 => Value::F32(0.0),
        NumericRank::F64 => Value::F64(0.0),
        NumericRank::Decimal => Value::Decimal(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprbind_core::NativeResult;

    fn noop() -> NativeFn {
        NativeFn::function(|_args| -> NativeResult { Ok(Value::Null) })
    }

    #[test]
    fn arity_considers_defaults() {
        let member = MemberDesc {
            name: "f".into(),
            kind: MemberKind::Method,
            flags: MemberFlags::empty(),
            declaring: TypeHash::from_name("T"),
            params: vec![
                ParamDesc::new("a", primitives::I32),
                ParamDesc::with_default("b", primitives::I32, Value::I32(10)),
            ],
            result: primitives::I32,
            invoke: noop(),
            set: None,
        };
        assert!(member.arity_accepts(1));
        assert!(member.arity_accepts(2));
        assert!(!member.arity_accepts(0));
        assert!(!member.arity_accepts(3));
    }

    #[test]
    fn defaults_of_kinds() {
        let b = TypeDesc::with_hash(primitives::BOOL, "bool", TypeKind::Bool);
        assert_eq!(b.default_value(), Value::Bool(false));
        let e = TypeDesc::new(
            "Color",
            TypeKind::Enum {
                underlying: NumericRank::I32,
                values: vec![("Red".into(), 0), ("Green".into(), 1)],
            },
        );
        assert_eq!(e.enum_value("Green"), Some(1));
        assert!(matches!(e.default_value(), Value::Enum { raw: 0, .. }));
        assert!(!e.is_reference());
    }

    #[test]
    fn value_types_fall_under_object() {
        let d = TypeDesc::with_hash(primitives::I32, "i32", TypeKind::Numeric(NumericRank::I32));
        assert_eq!(d.base(), Some(primitives::OBJECT));
        let o = TypeDesc::with_hash(primitives::OBJECT, "object", TypeKind::Object);
        assert_eq!(o.base(), None);
    }

    #[test]
    fn binary_overloads_split_by_category() {
        let mut tables = OperatorTables::default();
        let t = TypeHash::from_name("Vec2");
        tables.arithmetic.push(BinaryOperatorDesc {
            op: BinaryOp::Add,
            lhs: t,
            rhs: t,
            result: t,
            invoke: noop(),
        });
        tables.comparison.push(BinaryOperatorDesc {
            op: BinaryOp::Equal,
            lhs: t,
            rhs: t,
            result: primitives::BOOL,
            invoke: noop(),
        });
        assert_eq!(tables.binary_overloads(BinaryOp::Add).count(), 1);
        assert_eq!(tables.binary_overloads(BinaryOp::Equal).count(), 1);
        assert_eq!(tables.binary_overloads(BinaryOp::Subtract).count(), 0);
    }
}
