//! Fluent registration builders for host types.
//!
//! Hosts without a reflection source assemble descriptions by hand:
//!
//! ```
//! use exprbind_core::{NativeError, Value, primitives};
//! use exprbind_registry::{ClassBuilder, TypeUniverse};
//!
//! struct Point { x: f64, y: f64 }
//!
//! let universe = TypeUniverse::new();
//! let point = ClassBuilder::new("Point")
//!     .field("x", primitives::F64, |recv| {
//!         let p = recv.downcast::<Point>().ok_or_else(|| NativeError::msg("not a Point"))?;
//!         Ok(Value::F64(p.x))
//!     })
//!     .ctor(&[("x", primitives::F64), ("y", primitives::F64)], |args| {
//!         match (&args[0], &args[1]) {
//!             (Value::F64(x), Value::F64(y)) => {
//!                 Ok(Value::obj(exprbind_core::TypeHash::from_name("Point"), Point { x: *x, y: *y }))
//!             }
//!             _ => Err(NativeError::msg("expected two f64s")),
//!         }
//!     })
//!     .build();
//! universe.register(point).unwrap();
//! ```

use exprbind_core::{
    BinaryOp, NativeError, NativeFn, NativeResult, NumericRank, TypeHash, Value,
};

use crate::desc::{
    BinaryOperatorDesc, ConversionOp, MemberDesc, MemberFlags, MemberKind, ParamDesc, TypeDesc,
    TypeKind,
};

/// Builder for a class (host object) description.
pub struct ClassBuilder {
    hash: TypeHash,
    base: Option<TypeHash>,
    interfaces: Vec<TypeHash>,
    members: Vec<MemberDesc>,
    indexers: Vec<MemberDesc>,
    constructors: Vec<MemberDesc>,
    desc: TypeDesc,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = TypeHash::from_name(&name);
        ClassBuilder {
            hash,
            desc: TypeDesc::with_hash(
                hash,
                name,
                TypeKind::Class {
                    base: None,
                    interfaces: Vec::new(),
                },
            ),
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            indexers: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Identity this builder will register under.
    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn base(mut self, base: TypeHash) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, iface: TypeHash) -> Self {
        self.interfaces.push(iface);
        self
    }

    /// A readable field.
    pub fn field<F>(mut self, name: impl Into<String>, ty: TypeHash, getter: F) -> Self
    where
        F: Fn(&Value) -> NativeResult + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Field,
            flags: MemberFlags::READ_ONLY,
            declaring: self.hash,
            params: Vec::new(),
            result: ty,
            invoke: NativeFn::getter(getter),
            set: None,
        });
        self
    }

    /// A readable and writable field; the setter serves member
    /// initializers.
    pub fn field_mut<G, S>(
        mut self,
        name: impl Into<String>,
        ty: TypeHash,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(&Value) -> NativeResult + Send + Sync + 'static,
        S: Fn(&Value, &Value) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Field,
            flags: MemberFlags::empty(),
            declaring: self.hash,
            params: Vec::new(),
            result: ty,
            invoke: NativeFn::getter(getter),
            set: Some(NativeFn::method(move |recv, args| {
                setter(recv, &args[0])?;
                Ok(Value::Null)
            })),
        });
        self
    }

    /// A read-only computed property.
    pub fn property<F>(mut self, name: impl Into<String>, ty: TypeHash, getter: F) -> Self
    where
        F: Fn(&Value) -> NativeResult + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Property,
            flags: MemberFlags::READ_ONLY,
            declaring: self.hash,
            params: Vec::new(),
            result: ty,
            invoke: NativeFn::getter(getter),
            set: None,
        });
        self
    }

    /// An instance method with simple (defaultless) parameters.
    pub fn method<F>(
        self,
        name: impl Into<String>,
        params: &[(&str, TypeHash)],
        result: TypeHash,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        let params = params
            .iter()
            .map(|(n, t)| ParamDesc::new(*n, *t))
            .collect();
        self.method_full(name, params, result, f)
    }

    /// An instance method with full parameter descriptions (defaults,
    /// named-argument binding).
    pub fn method_full<F>(
        mut self,
        name: impl Into<String>,
        params: Vec<ParamDesc>,
        result: TypeHash,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Method,
            flags: MemberFlags::empty(),
            declaring: self.hash,
            params,
            result,
            invoke: NativeFn::method(f),
            set: None,
        });
        self
    }

    /// A static method.
    pub fn static_method<F>(
        mut self,
        name: impl Into<String>,
        params: &[(&str, TypeHash)],
        result: TypeHash,
        f: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Method,
            flags: MemberFlags::STATIC,
            declaring: self.hash,
            params: params.iter().map(|(n, t)| ParamDesc::new(*n, *t)).collect(),
            result,
            invoke: NativeFn::function(f),
            set: None,
        });
        self
    }

    /// A static readable property (constant-like).
    pub fn static_property<F>(mut self, name: impl Into<String>, ty: TypeHash, getter: F) -> Self
    where
        F: Fn() -> NativeResult + Send + Sync + 'static,
    {
        self.members.push(MemberDesc {
            name: name.into(),
            kind: MemberKind::Property,
            flags: MemberFlags::STATIC | MemberFlags::READ_ONLY,
            declaring: self.hash,
            params: Vec::new(),
            result: ty,
            invoke: NativeFn::function(move |_args| getter()),
            set: None,
        });
        self
    }

    /// A constructor.
    pub fn ctor<F>(self, params: &[(&str, TypeHash)], f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        let params = params.iter().map(|(n, t)| ParamDesc::new(*n, *t)).collect();
        self.ctor_full(params, f)
    }

    /// A constructor with full parameter descriptions.
    pub fn ctor_full<F>(mut self, params: Vec<ParamDesc>, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.constructors.push(MemberDesc {
            name: String::new(),
            kind: MemberKind::Constructor,
            flags: MemberFlags::STATIC,
            declaring: self.hash,
            params,
            result: self.hash,
            invoke: NativeFn::function(f),
            set: None,
        });
        self
    }

    /// An indexer.
    pub fn indexer<F>(mut self, params: &[(&str, TypeHash)], result: TypeHash, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.indexers.push(MemberDesc {
            name: String::new(),
            kind: MemberKind::Indexer,
            flags: MemberFlags::READ_ONLY,
            declaring: self.hash,
            params: params.iter().map(|(n, t)| ParamDesc::new(*n, *t)).collect(),
            result,
            invoke: NativeFn::method(f),
            set: None,
        });
        self
    }

    /// A binary operator overload with this type on the left.
    ///
    /// The callable receives `[lhs, rhs]`.
    pub fn operator<F>(mut self, op: BinaryOp, rhs: TypeHash, result: TypeHash, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        let desc = BinaryOperatorDesc {
            op,
            lhs: self.hash,
            rhs,
            result,
            invoke: NativeFn::function(f),
        };
        if op.is_comparison() {
            self.desc.operators.comparison.push(desc);
        } else {
            self.desc.operators.arithmetic.push(desc);
        }
        self
    }

    /// An implicit conversion from this type.
    pub fn implicit_to<F>(mut self, to: TypeHash, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.desc.operators.implicit_to.push(ConversionOp {
            other: to,
            invoke: NativeFn::function(f),
        });
        self
    }

    /// A cast-only conversion from this type.
    pub fn explicit_to<F>(mut self, to: TypeHash, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.desc.operators.explicit_to.push(ConversionOp {
            other: to,
            invoke: NativeFn::function(f),
        });
        self
    }

    /// An implicit conversion into this type.
    pub fn implicit_from<F>(mut self, from: TypeHash, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.desc.operators.implicit_from.push(ConversionOp {
            other: from,
            invoke: NativeFn::function(f),
        });
        self
    }

    /// A cast-only conversion into this type.
    pub fn explicit_from<F>(mut self, from: TypeHash, f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.desc.operators.explicit_from.push(ConversionOp {
            other: from,
            invoke: NativeFn::function(f),
        });
        self
    }

    /// Assemble the description.
    pub fn build(self) -> TypeDesc {
        let mut desc = self.desc;
        desc.kind = TypeKind::Class {
            base: self.base,
            interfaces: self.interfaces,
        };
        for member in self.members {
            desc.members.entry(member.name.clone()).or_default().push(member);
        }
        desc.indexers = self.indexers;
        desc.constructors = self.constructors;
        desc
    }
}

/// Builder for an interface description.
pub struct InterfaceBuilder {
    desc: TypeDesc,
}

impl InterfaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceBuilder {
            desc: TypeDesc::new(name, TypeKind::Interface),
        }
    }

    /// Declare a readable member on the interface.
    pub fn property<F>(mut self, name: impl Into<String>, ty: TypeHash, getter: F) -> Self
    where
        F: Fn(&Value) -> NativeResult + Send + Sync + 'static,
    {
        let member = MemberDesc {
            name: name.into(),
            kind: MemberKind::Property,
            flags: MemberFlags::READ_ONLY,
            declaring: self.desc.hash,
            params: Vec::new(),
            result: ty,
            invoke: NativeFn::getter(getter),
            set: None,
        };
        self.desc.members.entry(member.name.clone()).or_default().push(member);
        self
    }

    pub fn build(self) -> TypeDesc {
        self.desc
    }
}

/// Builder for an enum description.
pub struct EnumBuilder {
    name: String,
    underlying: NumericRank,
    values: Vec<(String, i64)>,
}

impl EnumBuilder {
    pub fn new(name: impl Into<String>, underlying: NumericRank) -> Self {
        EnumBuilder {
            name: name.into(),
            underlying,
            values: Vec::new(),
        }
    }

    /// Declare a named value; declaration order is preserved.
    pub fn value(mut self, name: impl Into<String>, raw: i64) -> Self {
        self.values.push((name.into(), raw));
        self
    }

    pub fn build(self) -> TypeDesc {
        TypeDesc::new(
            self.name,
            TypeKind::Enum {
                underlying: self.underlying,
                values: self.values,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprbind_core::primitives;

    #[test]
    fn class_builder_groups_overloads_by_name() {
        let desc = ClassBuilder::new("Calc")
            .method("eval", &[("x", primitives::I32)], primitives::I32, |_r, a| {
                Ok(a[0].clone())
            })
            .method("eval", &[("x", primitives::I64)], primitives::I64, |_r, a| {
                Ok(a[0].clone())
            })
            .build();
        assert_eq!(desc.members_named("eval").len(), 2);
        // Declaration order inside the group is preserved.
        assert_eq!(desc.members_named("eval")[0].params[0].param_type, primitives::I32);
    }

    #[test]
    fn operators_land_in_their_category() {
        let other = TypeHash::from_name("Other");
        let desc = ClassBuilder::new("Vec2")
            .operator(BinaryOp::Add, other, other, |_a| Ok(Value::Null))
            .operator(BinaryOp::Equal, other, primitives::BOOL, |_a| Ok(Value::Bool(true)))
            .implicit_to(primitives::STRING, |_a| Ok(Value::str("vec")))
            .build();
        assert_eq!(desc.operators.arithmetic.len(), 1);
        assert_eq!(desc.operators.comparison.len(), 1);
        assert_eq!(desc.operators.implicit_to.len(), 1);
    }

    #[test]
    fn enum_builder_preserves_declaration_order() {
        let desc = EnumBuilder::new("Status", NumericRank::I32)
            .value("Idle", 0)
            .value("Busy", 5)
            .build();
        assert_eq!(desc.enum_value("Busy"), Some(5));
        match &desc.kind {
            TypeKind::Enum { values, .. } => {
                assert_eq!(values[0].0, "Idle");
                assert_eq!(values[1].0, "Busy");
            }
            other => panic!("expected enum kind, got {other:?}"),
        }
    }
}
