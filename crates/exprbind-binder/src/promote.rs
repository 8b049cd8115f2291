//! Numeric promotion rules.
//!
//! Mirrors conventional typed-OO integer/float promotion: operands smaller
//! than the 32-bit word widen to `i32`; float and decimal operands are
//! contagious, except that decimal never mixes with binary floats (a hard
//! binding error, not a runtime one); unsigned operands follow the fixed
//! precedence u64 > i64 > u32 > i32.
//!
//! One asymmetry is deliberate and load-bearing: a signed operand paired
//! with `u32` promotes to `i64`, but a signed operand paired with `u64` is
//! rejected outright. This mirrors the target type system's own binding
//! rules.

use std::fmt;

use exprbind_core::NumericRank;

/// Why a pair of numeric operands refuses to promote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionError {
    /// Decimal operands never mix with `f32`/`f64`.
    DecimalWithFloat,
    /// A signed operand has no common rank with `u64`.
    SignedWithU64,
    /// Negation of `u64` has no representable result rank.
    NegateU64,
}

impl fmt::Display for PromotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionError::DecimalWithFloat => {
                write!(f, "decimal operands cannot mix with binary floating point")
            }
            PromotionError::SignedWithU64 => {
                write!(f, "signed and u64 operands have no common type")
            }
            PromotionError::NegateU64 => write!(f, "cannot negate a u64 operand"),
        }
    }
}

/// Common rank for a pair of numeric operands.
pub fn promote_pair(lhs: NumericRank, rhs: NumericRank) -> Result<NumericRank, PromotionError> {
    use NumericRank::*;

    if lhs == Decimal || rhs == Decimal {
        let other = if lhs == Decimal { rhs } else { lhs };
        if other.is_binary_float() {
            return Err(PromotionError::DecimalWithFloat);
        }
        return Ok(Decimal);
    }
    if lhs == F64 || rhs == F64 {
        return Ok(F64);
    }
    if lhs == F32 || rhs == F32 {
        return Ok(F32);
    }
    if lhs == U64 || rhs == U64 {
        let other = if lhs == U64 { rhs } else { lhs };
        if other.is_signed_integer() {
            return Err(PromotionError::SignedWithU64);
        }
        return Ok(U64);
    }
    if lhs == I64 || rhs == I64 {
        return Ok(I64);
    }
    if lhs == U32 || rhs == U32 {
        let other = if lhs == U32 { rhs } else { lhs };
        if other.is_signed_integer() {
            // The deliberate asymmetry: signed + u32 widens to i64.
            return Ok(I64);
        }
        return Ok(U32);
    }
    Ok(I32)
}

/// Unary promotion: sub-word integers widen to `i32`.
pub fn promote_single(rank: NumericRank) -> NumericRank {
    if rank.is_sub_word() {
        NumericRank::I32
    } else {
        rank
    }
}

/// Promotion for negation: `u32` widens to `i64`; `u64` is rejected.
pub fn promote_negate(rank: NumericRank) -> Result<NumericRank, PromotionError> {
    match rank {
        NumericRank::U64 => Err(PromotionError::NegateU64),
        NumericRank::U32 => Ok(NumericRank::I64),
        other => Ok(promote_single(other)),
    }
}

/// Whether a numeric conversion is widening (value-preserving by the target
/// type system's own implicit-conversion table). Everything else numeric is
/// narrowing/precision-losing.
pub fn is_widening(from: NumericRank, to: NumericRank) -> bool {
    use NumericRank::*;
    if from == to {
        return true;
    }
    match from {
        I8 => matches!(to, I16 | I32 | I64 | F32 | F64 | Decimal),
        U8 => matches!(to, I16 | U16 | I32 | U32 | I64 | U64 | F32 | F64 | Decimal),
        I16 => matches!(to, I32 | I64 | F32 | F64 | Decimal),
        U16 => matches!(to, I32 | U32 | I64 | U64 | F32 | F64 | Decimal),
        I32 => matches!(to, I64 | F32 | F64 | Decimal),
        U32 => matches!(to, I64 | U64 | F32 | F64 | Decimal),
        I64 => matches!(to, F32 | F64 | Decimal),
        U64 => matches!(to, F32 | F64 | Decimal),
        F32 => matches!(to, F64),
        F64 | Decimal => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NumericRank::*;

    #[test]
    fn sub_word_operands_widen_to_i32() {
        assert_eq!(promote_pair(U8, U8), Ok(I32));
        assert_eq!(promote_pair(I8, I16), Ok(I32));
        assert_eq!(promote_single(U16), I32);
        assert_eq!(promote_single(I64), I64);
    }

    #[test]
    fn float_contagion() {
        assert_eq!(promote_pair(I32, F64), Ok(F64));
        assert_eq!(promote_pair(F32, I64), Ok(F32));
        assert_eq!(promote_pair(F32, F64), Ok(F64));
    }

    #[test]
    fn decimal_mixes_with_integers_only() {
        assert_eq!(promote_pair(Decimal, I64), Ok(Decimal));
        assert_eq!(promote_pair(U32, Decimal), Ok(Decimal));
        assert_eq!(promote_pair(Decimal, F64), Err(PromotionError::DecimalWithFloat));
        assert_eq!(promote_pair(F32, Decimal), Err(PromotionError::DecimalWithFloat));
    }

    #[test]
    fn unsigned_precedence() {
        assert_eq!(promote_pair(U64, U32), Ok(U64));
        assert_eq!(promote_pair(U64, U64), Ok(U64));
        assert_eq!(promote_pair(I64, U32), Ok(I64));
        assert_eq!(promote_pair(U32, U32), Ok(U32));
        assert_eq!(promote_pair(U32, U8), Ok(U32));
    }

    #[test]
    fn signed_unsigned_asymmetry_is_preserved() {
        // signed + u32 widens to i64 ...
        assert_eq!(promote_pair(I32, U32), Ok(I64));
        assert_eq!(promote_pair(I8, U32), Ok(I64));
        // ... but signed + u64 is rejected, never silently widened.
        assert_eq!(promote_pair(I32, U64), Err(PromotionError::SignedWithU64));
        assert_eq!(promote_pair(U64, I64), Err(PromotionError::SignedWithU64));
    }

    #[test]
    fn negate_promotion() {
        assert_eq!(promote_negate(U32), Ok(I64));
        assert_eq!(promote_negate(U8), Ok(I32));
        assert_eq!(promote_negate(I64), Ok(I64));
        assert_eq!(promote_negate(U64), Err(PromotionError::NegateU64));
    }

    #[test]
    fn widening_table() {
        assert!(is_widening(I32, I64));
        assert!(is_widening(I32, F32));
        assert!(is_widening(U32, U64));
        assert!(!is_widening(I64, I32));
        assert!(!is_widening(F64, F32));
        assert!(!is_widening(F64, Decimal));
        assert!(!is_widening(U64, I64));
        assert!(is_widening(U8, U64));
    }
}
