//! Runtime arithmetic, comparison, and conversion kernels.
//!
//! Failure semantics mirror what equivalent hand-written code raises:
//! integer division/modulo by zero raises divide-by-zero; `MIN / -1`
//! raises overflow even in unchecked mode; unchecked integer arithmetic
//! wraps; float division by zero follows IEEE; decimal arithmetic is
//! always range-checked; shift counts mask to the operand width.

use exprbind_core::{BinaryOp, EvalError, NumericRank, TypeHash, UnaryOp, Value};
use rust_decimal::{Decimal, MathematicalOps};

/// Lifted comparison results when either operand is null: equality is
/// "both null", ordering is always false, arithmetic is null.
pub(crate) fn lifted_null_result(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    let both_null = lhs.is_null() && rhs.is_null();
    match op {
        BinaryOp::Equal => Value::Bool(both_null),
        BinaryOp::NotEqual => Value::Bool(!both_null),
        op if op.is_comparison() => Value::Bool(false),
        _ => Value::Null,
    }
}

/// Builtin binary operation at a promoted rank.
pub(crate) fn numeric_binary(
    op: BinaryOp,
    rank: NumericRank,
    lifted: bool,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, EvalError> {
    if lifted && (lhs.is_null() || rhs.is_null()) {
        return Ok(lifted_null_result(op, lhs, rhs));
    }
    match rank {
        NumericRank::F32 | NumericRank::F64 => float_binary(op, rank, lhs, rhs),
        NumericRank::Decimal => decimal_binary(op, lhs, rhs),
        _ => integer_binary(op, rank, lhs, rhs),
    }
}

fn integer_binary(
    op: BinaryOp,
    rank: NumericRank,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, EvalError> {
    let a = expect_int(lhs, op)?;
    let b = expect_int(rhs, op)?;

    if op.is_comparison() {
        // Operands are mathematical integers here, so one widened compare
        // is correct for every signed/unsigned rank.
        return Ok(Value::Bool(match op {
            BinaryOp::Equal => a == b,
            BinaryOp::NotEqual => a != b,
            BinaryOp::GreaterThan => a > b,
            BinaryOp::GreaterThanOrEqual => a >= b,
            BinaryOp::LessThan => a < b,
            BinaryOp::LessThanOrEqual => a <= b,
            _ => false,
        }));
    }

    let bits = rank.integer_bits();
    let wide: i128 = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Subtract => a.wrapping_sub(b),
        BinaryOp::Multiply => a.wrapping_mul(b),
        BinaryOp::Divide => {
            if b == 0 {
                return Err(EvalError::DivideByZero);
            }
            let q = a / b;
            // MIN / -1 escapes the rank even though i128 holds it.
            return Value::from_integer(rank, q, true).ok_or(EvalError::Overflow {
                op: "division".into(),
            });
        }
        BinaryOp::Modulo => {
            if b == 0 {
                return Err(EvalError::DivideByZero);
            }
            a % b
        }
        BinaryOp::LeftShift => a << (b as u32 & (bits - 1)),
        BinaryOp::RightShift => a >> (b as u32 & (bits - 1)),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::ExclusiveOr => a ^ b,
        BinaryOp::Power => {
            return Err(unexpected(op, lhs));
        }
        _ => return Err(unexpected(op, lhs)),
    };
    Value::from_integer(rank, wide, false).ok_or_else(|| EvalError::Overflow {
        op: format!("integer {}", op.symbol()),
    })
}

fn float_binary(
    op: BinaryOp,
    rank: NumericRank,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, EvalError> {
    let a = expect_float(lhs, op)?;
    let b = expect_float(rhs, op)?;
    if op.is_comparison() {
        return Ok(Value::Bool(match op {
            BinaryOp::Equal => a == b,
            BinaryOp::NotEqual => a != b,
            BinaryOp::GreaterThan => a > b,
            BinaryOp::GreaterThanOrEqual => a >= b,
            BinaryOp::LessThan => a < b,
            BinaryOp::LessThanOrEqual => a <= b,
            _ => false,
        }));
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        // IEEE semantics: division by zero yields an infinity, not an error.
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        BinaryOp::Power => a.powf(b),
        _ => return Err(unexpected(op, lhs)),
    };
    Ok(match rank {
        NumericRank::F32 => Value::F32(result as f32),
        _ => Value::F64(result),
    })
}

fn decimal_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let a = expect_decimal(lhs, op)?;
    let b = expect_decimal(rhs, op)?;
    if op.is_comparison() {
        return Ok(Value::Bool(match op {
            BinaryOp::Equal => a == b,
            BinaryOp::NotEqual => a != b,
            BinaryOp::GreaterThan => a > b,
            BinaryOp::GreaterThanOrEqual => a >= b,
            BinaryOp::LessThan => a < b,
            BinaryOp::LessThanOrEqual => a <= b,
            _ => false,
        }));
    }
    let overflow = || EvalError::Overflow {
        op: format!("decimal {}", op.symbol()),
    };
    let result = match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Subtract => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Divide => {
            if b.is_zero() {
                return Err(EvalError::DivideByZero);
            }
            a.checked_div(b).ok_or_else(overflow)?
        }
        BinaryOp::Modulo => {
            if b.is_zero() {
                return Err(EvalError::DivideByZero);
            }
            a.checked_rem(b).ok_or_else(overflow)?
        }
        BinaryOp::Power => a.checked_powd(b).ok_or_else(overflow)?,
        _ => return Err(unexpected(op, lhs)),
    };
    Ok(Value::Decimal(result))
}

/// Builtin unary operation at a promoted rank.
pub(crate) fn numeric_unary(
    op: UnaryOp,
    rank: NumericRank,
    lifted: bool,
    operand: &Value,
) -> Result<Value, EvalError> {
    if lifted && operand.is_null() {
        return Ok(Value::Null);
    }
    match rank {
        NumericRank::F32 | NumericRank::F64 => {
            let v = expect_float_unary(operand, op)?;
            let result = match op {
                UnaryOp::Negate => -v,
                UnaryOp::UnaryPlus => v,
                _ => return Err(unexpected_unary(op, operand)),
            };
            Ok(match rank {
                NumericRank::F32 => Value::F32(result as f32),
                _ => Value::F64(result),
            })
        }
        NumericRank::Decimal => {
            let v = match operand {
                Value::Decimal(d) => *d,
                _ => return Err(unexpected_unary(op, operand)),
            };
            match op {
                UnaryOp::Negate => Ok(Value::Decimal(-v)),
                UnaryOp::UnaryPlus => Ok(Value::Decimal(v)),
                _ => Err(unexpected_unary(op, operand)),
            }
        }
        _ => {
            let v = operand.to_i128().ok_or_else(|| unexpected_unary(op, operand))?;
            let wide = match op {
                UnaryOp::Negate => v.wrapping_neg(),
                UnaryOp::UnaryPlus => v,
                UnaryOp::Complement => !v,
                UnaryOp::Not => return Err(unexpected_unary(op, operand)),
            };
            Value::from_integer(rank, wide, false).ok_or_else(|| EvalError::Overflow {
                op: format!("unary {}", op.symbol()),
            })
        }
    }
}

/// String concatenation; null renders as empty text.
pub(crate) fn concat(lhs: &Value, rhs: &Value) -> Value {
    Value::str(format!("{lhs}{rhs}"))
}

fn expect_int(v: &Value, op: BinaryOp) -> Result<i128, EvalError> {
    v.to_i128().ok_or_else(|| unexpected(op, v))
}

fn expect_float(v: &Value, op: BinaryOp) -> Result<f64, EvalError> {
    match v {
        Value::F32(f) => Ok(f64::from(*f)),
        Value::F64(f) => Ok(*f),
        _ => Err(unexpected(op, v)),
    }
}

fn expect_float_unary(v: &Value, op: UnaryOp) -> Result<f64, EvalError> {
    match v {
        Value::F32(f) => Ok(f64::from(*f)),
        Value::F64(f) => Ok(*f),
        _ => Err(unexpected_unary(op, v)),
    }
}

fn expect_decimal(v: &Value, op: BinaryOp) -> Result<Decimal, EvalError> {
    match v {
        Value::Decimal(d) => Ok(*d),
        _ => Err(unexpected(op, v)),
    }
}

fn unexpected(op: BinaryOp, v: &Value) -> EvalError {
    EvalError::UnexpectedValue {
        what: format!("operator '{}'", op.symbol()),
        expected: "a numeric operand".into(),
        got: v.kind_name().into(),
    }
}

fn unexpected_unary(op: UnaryOp, v: &Value) -> EvalError {
    EvalError::UnexpectedValue {
        what: format!("operator '{}'", op.symbol()),
        expected: "a numeric operand".into(),
        got: v.kind_name().into(),
    }
}


/// Re-wrap an arithmetic result as an enum value.
pub(crate) fn wrap_enum(result: Value, enum_ty: TypeHash) -> Result<Value, EvalError> {
    if result.is_null() {
        return Ok(Value::Null);
    }
    let raw = result.to_i128().ok_or_else(|| EvalError::UnexpectedValue {
        what: "enum arithmetic".into(),
        expected: "an integer result".into(),
        got: result.kind_name().into(),
    })?;
    Ok(Value::Enum {
        ty: enum_ty,
        raw: raw as i64,
    })
}
