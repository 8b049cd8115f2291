//! Dynamic runtime values.
//!
//! [`Value`] is the single value representation flowing through evaluation:
//! every frame slot, constant, argument, and member result is one. Host
//! objects ride behind `Arc<dyn Any + Send + Sync>`; numerics are stored at
//! their exact declared width so conversions inserted by the binder are
//! observable at run time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::TypeHash;
use crate::primitives::{self, NumericRank};

/// A multi-dimensional array value with row-major flat storage.
///
/// Single-dimension arrays have `dims.len() == 1`. Contents are frozen once
/// construction finishes; evaluation never mutates an array in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    /// Element type identity.
    pub elem: TypeHash,
    /// Length of each dimension.
    pub dims: Vec<usize>,
    /// Row-major element storage; `len == dims.iter().product()`.
    pub items: Vec<Value>,
}

impl ArrayValue {
    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flat offset of a multi-dimension index tuple, if in bounds.
    ///
    /// Returns the out-of-range (index, dimension length) pair on failure.
    pub fn offset_of(&self, indices: &[i64]) -> Result<usize, (i64, usize)> {
        let mut offset = 0usize;
        for (idx, len) in indices.iter().zip(self.dims.iter()) {
            if *idx < 0 || *idx as usize >= *len {
                return Err((*idx, *len));
            }
            offset = offset * len + *idx as usize;
        }
        Ok(offset)
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    /// Null reference or empty nullable.
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(Arc<str>),
    /// An enum value: the enum type plus its underlying integer, widened.
    Enum { ty: TypeHash, raw: i64 },
    Array(Arc<ArrayValue>),
    /// A host object of a registered class type.
    Obj {
        ty: TypeHash,
        obj: Arc<dyn Any + Send + Sync>,
    },
    /// A type literal, produced by `TypeOf`.
    Type(TypeHash),
    /// A compiled lambda; the payload is owned by the execution engine.
    Lambda {
        ty: TypeHash,
        payload: Arc<dyn Any + Send + Sync>,
    },
    /// A quoted (unevaluated) lambda.
    Quoted {
        ty: TypeHash,
        payload: Arc<dyn Any + Send + Sync>,
    },
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Build a host object value.
    pub fn obj<T: Any + Send + Sync>(ty: TypeHash, obj: T) -> Value {
        Value::Obj {
            ty,
            obj: Arc::new(obj),
        }
    }

    /// Downcast a host object value to a concrete type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Obj { obj, .. } => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime type identity of this value.
    ///
    /// `Null` reports the null-literal type; the static type of the slot it
    /// came from may be more precise.
    pub fn type_of(&self) -> TypeHash {
        match self {
            Value::Null => primitives::NULL,
            Value::Bool(_) => primitives::BOOL,
            Value::I8(_) => primitives::I8,
            Value::I16(_) => primitives::I16,
            Value::I32(_) => primitives::I32,
            Value::I64(_) => primitives::I64,
            Value::U8(_) => primitives::U8,
            Value::U16(_) => primitives::U16,
            Value::U32(_) => primitives::U32,
            Value::U64(_) => primitives::U64,
            Value::F32(_) => primitives::F32,
            Value::F64(_) => primitives::F64,
            Value::Decimal(_) => primitives::DECIMAL,
            Value::Str(_) => primitives::STRING,
            Value::Enum { ty, .. } => *ty,
            Value::Array(a) => a.elem.array_of(a.dims.len() as u32),
            Value::Obj { ty, .. } => *ty,
            Value::Type(_) => primitives::TYPE,
            Value::Lambda { ty, .. } => *ty,
            Value::Quoted { ty, .. } => *ty,
        }
    }

    /// Numeric rank of this value, if numeric.
    pub fn numeric_rank(&self) -> Option<NumericRank> {
        NumericRank::of(self.type_of())
    }

    /// Integer content widened to i128, for integer-valued variants.
    pub fn to_i128(&self) -> Option<i128> {
        Some(match self {
            Value::I8(v) => i128::from(*v),
            Value::I16(v) => i128::from(*v),
            Value::I32(v) => i128::from(*v),
            Value::I64(v) => i128::from(*v),
            Value::U8(v) => i128::from(*v),
            Value::U16(v) => i128::from(*v),
            Value::U32(v) => i128::from(*v),
            Value::U64(v) => i128::from(*v),
            Value::Enum { raw, .. } => i128::from(*raw),
            _ => return None,
        })
    }

    /// Lossy floating view of any numeric value.
    pub fn to_f64_lossy(&self) -> Option<f64> {
        Some(match self {
            Value::F32(v) => f64::from(*v),
            Value::F64(v) => *v,
            Value::Decimal(v) => v.to_f64()?,
            other => other.to_i128()? as f64,
        })
    }

    /// Convert a numeric value to another numeric rank.
    ///
    /// `checked` demands the value fit the target exactly (integer range
    /// checks; decimal conversions are always range-checked). Unchecked
    /// integer narrowing truncates like a two's-complement cast; unchecked
    /// float-to-integer saturates at the target range. Returns `None` when
    /// the value is not numeric or a checked conversion would overflow.
    pub fn cast_numeric(&self, to: NumericRank, checked: bool) -> Option<Value> {
        if self.numeric_rank() == Some(to) {
            return Some(self.clone());
        }
        match to {
            NumericRank::F32 => Some(Value::F32(self.to_f64_lossy()? as f32)),
            NumericRank::F64 => Some(Value::F64(self.to_f64_lossy()?)),
            NumericRank::Decimal => match self {
                Value::Decimal(d) => Some(Value::Decimal(*d)),
                Value::F32(v) => Decimal::from_f32(*v).map(Value::Decimal),
                Value::F64(v) => Decimal::from_f64(*v).map(Value::Decimal),
                // Integer sources are at most 64 bits wide, always in range.
                other => Some(Value::Decimal(Decimal::from_i128_with_scale(
                    other.to_i128()?,
                    0,
                ))),
            },
            integer => {
                let wide: i128 = match self {
                    Value::F32(v) => float_to_i128(f64::from(*v), integer, checked)?,
                    Value::F64(v) => float_to_i128(*v, integer, checked)?,
                    Value::Decimal(d) => d.trunc().to_i128()?,
                    other => other.to_i128()?,
                };
                integer_from_i128(wide, integer, checked || matches!(self, Value::Decimal(_)))
            }
        }
    }

    /// Build an integer value of a rank from widened arithmetic.
    ///
    /// Unchecked mode truncates like a two's-complement cast; checked mode
    /// returns `None` when the result does not fit the rank.
    pub fn from_integer(rank: NumericRank, wide: i128, checked: bool) -> Option<Value> {
        integer_from_i128(wide, rank, checked)
    }

    /// Short name of this value's runtime type, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Enum { .. } => "enum",
            Value::Array(_) => "array",
            Value::Obj { .. } => "object",
            Value::Type(_) => "type",
            Value::Lambda { .. } => "lambda",
            Value::Quoted { .. } => "quoted lambda",
        }
    }
}

/// Unchecked float-to-integer saturates at the target range; checked mode
/// refuses anything outside it (including NaN either way).
fn float_to_i128(v: f64, to: NumericRank, checked: bool) -> Option<i128> {
    if v.is_nan() {
        return None;
    }
    let truncated = v.trunc();
    let (lo, hi) = integer_range(to);
    if truncated < lo as f64 {
        return if checked { None } else { Some(lo) };
    }
    if truncated > hi as f64 {
        return if checked { None } else { Some(hi) };
    }
    Some(truncated as i128)
}

fn integer_range(rank: NumericRank) -> (i128, i128) {
    match rank {
        NumericRank::I8 => (i8::MIN as i128, i8::MAX as i128),
        NumericRank::U8 => (0, u8::MAX as i128),
        NumericRank::I16 => (i16::MIN as i128, i16::MAX as i128),
        NumericRank::U16 => (0, u16::MAX as i128),
        NumericRank::I32 => (i32::MIN as i128, i32::MAX as i128),
        NumericRank::U32 => (0, u32::MAX as i128),
        NumericRank::I64 => (i64::MIN as i128, i64::MAX as i128),
        NumericRank::U64 => (0, u64::MAX as i128),
        _ => (0, 0),
    }
}

fn integer_from_i128(wide: i128, to: NumericRank, checked: bool) -> Option<Value> {
    let (lo, hi) = integer_range(to);
    if checked && (wide < lo || wide > hi) {
        return None;
    }
    Some(match to {
        NumericRank::I8 => Value::I8(wide as i8),
        NumericRank::U8 => Value::U8(wide as u8),
        NumericRank::I16 => Value::I16(wide as i16),
        NumericRank::U16 => Value::U16(wide as u16),
        NumericRank::I32 => Value::I32(wide as i32),
        NumericRank::U32 => Value::U32(wide as u32),
        NumericRank::I64 => Value::I64(wide as i64),
        NumericRank::U64 => Value::U64(wide as u64),
        _ => return None,
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum { ty: ta, raw: ra }, Value::Enum { ty: tb, raw: rb }) => {
                ta == tb && ra == rb
            }
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Obj { obj: a, .. }, Value::Obj { obj: b, .. }) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Lambda { payload: a, .. }, Value::Lambda { payload: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Quoted { payload: a, .. }, Value::Quoted { payload: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I8(v) => write!(f, "I8({v})"),
            Value::I16(v) => write!(f, "I16({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::U8(v) => write!(f, "U8({v})"),
            Value::U16(v) => write!(f, "U16({v})"),
            Value::U32(v) => write!(f, "U32({v})"),
            Value::U64(v) => write!(f, "U64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Decimal(v) => write!(f, "Decimal({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Enum { ty, raw } => write!(f, "Enum({ty:?}, {raw})"),
            Value::Array(a) => write!(f, "Array(dims={:?}, len={})", a.dims, a.len()),
            Value::Obj { ty, .. } => write!(f, "Obj({ty:?})"),
            Value::Type(t) => write!(f, "Type({t:?})"),
            Value::Lambda { ty, .. } => write!(f, "Lambda({ty:?})"),
            Value::Quoted { ty, .. } => write!(f, "Quoted({ty:?})"),
        }
    }
}

/// Display renders values the way string concatenation sees them: bare
/// numerics, unquoted strings, empty text for null.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Enum { raw, .. } => write!(f, "{raw}"),
            Value::Array(a) => write!(f, "array[{}]", a.len()),
            Value::Obj { .. } => write!(f, "object"),
            Value::Type(t) => write!(f, "{t:?}"),
            Value::Lambda { .. } => write!(f, "lambda"),
            Value::Quoted { .. } => write!(f, "quoted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cast_widens_and_narrows() {
        assert_eq!(Value::I32(7).cast_numeric(NumericRank::I64, true), Some(Value::I64(7)));
        assert_eq!(Value::I64(300).cast_numeric(NumericRank::U8, true), None);
        // Unchecked narrowing truncates like a two's-complement cast.
        assert_eq!(
            Value::I64(300).cast_numeric(NumericRank::U8, false),
            Some(Value::U8(44))
        );
    }

    #[test]
    fn decimal_casts_are_always_checked() {
        let big = Value::Decimal(Decimal::from(i64::MAX) + Decimal::from(1));
        assert_eq!(big.cast_numeric(NumericRank::I64, false), None);
        let ok = Value::Decimal(Decimal::from(42));
        assert_eq!(ok.cast_numeric(NumericRank::I32, false), Some(Value::I32(42)));
    }

    #[test]
    fn float_to_int_saturates_unchecked() {
        assert_eq!(
            Value::F64(1e20).cast_numeric(NumericRank::I32, false),
            Some(Value::I32(i32::MAX))
        );
        assert_eq!(Value::F64(1e20).cast_numeric(NumericRank::I32, true), None);
        assert_eq!(Value::F64(f64::NAN).cast_numeric(NumericRank::I32, false), None);
    }

    #[test]
    fn enum_casts_to_underlying() {
        let color = Value::Enum {
            ty: TypeHash::from_name("Color"),
            raw: 2,
        };
        assert_eq!(color.cast_numeric(NumericRank::I32, true), Some(Value::I32(2)));
    }

    #[test]
    fn equality_is_structural_for_data_values() {
        assert_eq!(Value::str("ab"), Value::str("ab"));
        assert_ne!(Value::I32(1), Value::I64(1));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn array_offset_is_row_major() {
        let a = ArrayValue {
            elem: primitives::I32,
            dims: vec![2, 3],
            items: (0..6).map(Value::I32).collect(),
        };
        assert_eq!(a.offset_of(&[1, 2]), Ok(5));
        assert_eq!(a.offset_of(&[0, 1]), Ok(1));
        assert_eq!(a.offset_of(&[2, 0]), Err((2, 2)));
        assert_eq!(a.offset_of(&[-1, 0]), Err((-1, 2)));
    }

    #[test]
    fn display_matches_concatenation_semantics() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::I32(1).to_string(), "1");
        assert_eq!(Value::str("x").to_string(), "x");
    }
}
