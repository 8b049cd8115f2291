//! Coercion of a bound expression to a target type.
//!
//! Implements the graded lookup order used by every argument, operand, and
//! result coercion:
//!
//! 1. identity — the types already match;
//! 2. the null literal against a nullable-or-reference target;
//! 3. nullable wrap (`T` to `T?`), synthesized in place;
//! 4. enum/underlying conversions, synthesized in place;
//! 5. numeric rank conversion, folding constants in place;
//! 6. the conversion table: natural (inheritance) compatibility beats a
//!    user implicit operator, which beats a user explicit operator — the
//!    latter usable only when the coercion was explicitly requested;
//! 7. explicitly-requested downcasts/unboxes, checked at run time.
//!
//! Every successful path returns the rewritten expression plus its quality
//! grade; `None` means the types are incompatible.

use exprbind_core::{BindError, NumericRank, Span, TypeHash};
use exprbind_registry::quality;

use crate::bound::{BoundExpr, Conversion};
use crate::expr::Binder;
use crate::promote;

/// A coerced expression with the grade of the conversion that produced it.
pub(crate) struct Coerced<'b> {
    pub expr: &'b BoundExpr<'b>,
    pub quality: f64,
}

impl<'b, 'u> Binder<'b, 'u> {
    /// Coerce `expr` to `target`, or report a structured mismatch.
    pub(crate) fn coerce_or_err(
        &mut self,
        expr: &'b BoundExpr<'b>,
        target: TypeHash,
        explicit: bool,
        span: Option<Span>,
        what: &str,
    ) -> Result<&'b BoundExpr<'b>, BindError> {
        match self.coerce(expr, target, explicit) {
            Some(coerced) => Ok(coerced.expr),
            None => Err(BindError::TypeMismatch {
                message: format!(
                    "no conversion from '{}' to '{}' for {what}",
                    self.type_name(expr.ty),
                    self.type_name(target),
                ),
                span,
            }),
        }
    }

    /// Coerce `expr` to `target`, grading the conversion.
    ///
    /// `explicit` unlocks cast-only paths (explicit operators, unboxing,
    /// nullable unwrap). Returns `None` when no conversion exists.
    pub(crate) fn coerce(
        &mut self,
        expr: &'b BoundExpr<'b>,
        target: TypeHash,
        explicit: bool,
    ) -> Option<Coerced<'b>> {
        // 1. Identity.
        if expr.ty == target {
            return Some(Coerced {
                expr,
                quality: quality::EXACT,
            });
        }

        let target_desc = self.universe.try_describe(target)?;

        // 2. The null literal inhabits any nullable-or-reference target.
        if self.is_null_literal(expr) {
            if target_desc.accepts_null() {
                let retyped = self.convert(expr, target, Conversion::Identity, false);
                return Some(Coerced {
                    expr: retyped,
                    quality: quality::EXACT,
                });
            }
            return None;
        }

        // 3. Nullable wrap: T to T?.
        if target_desc.nullable_underlying() == Some(expr.ty) {
            let wrapped = self.convert(expr, target, Conversion::NullableWrap, false);
            return Some(Coerced {
                expr: wrapped,
                quality: quality::IN_PLACE,
            });
        }

        let source_desc = self.universe.try_describe(expr.ty)?;

        // 3b. Nullable unwrap (T? to T) under an explicit request.
        if explicit && source_desc.nullable_underlying() == Some(target) {
            let unwrapped = self.convert(expr, target, Conversion::NullableUnwrap, false);
            return Some(Coerced {
                expr: unwrapped,
                quality: quality::IN_PLACE,
            });
        }

        // 4. Enum conversions synthesized in place.
        if source_desc.enum_underlying().is_some() {
            if let Some(to_rank) = NumericRank::of(target) {
                let converted =
                    self.convert(expr, target, Conversion::EnumToUnderlying { to: to_rank }, false);
                return Some(Coerced {
                    expr: converted,
                    quality: quality::IN_PLACE,
                });
            }
        }
        if target_desc.enum_underlying().is_some() {
            if NumericRank::of(expr.ty).is_some() {
                let converted =
                    self.convert(expr, target, Conversion::UnderlyingToEnum { enum_ty: target }, false);
                return Some(Coerced {
                    expr: converted,
                    quality: quality::IN_PLACE,
                });
            }
        }

        // 5. Numeric rank conversions.
        if let (Some(from), Some(to)) = (NumericRank::of(expr.ty), NumericRank::of(target)) {
            return Some(self.coerce_numeric(expr, target, from, to));
        }
        // Lifted numeric pair: U? to V? keeps null, converts the payload.
        if let (Some(from_u), Some(to_u)) = (
            source_desc.nullable_underlying(),
            target_desc.nullable_underlying(),
        ) {
            if let (Some(from), Some(to)) = (NumericRank::of(from_u), NumericRank::of(to_u)) {
                let q = if promote::is_widening(from, to) {
                    quality::WIDENING
                } else {
                    quality::NARROWING
                };
                let converted = self.convert(expr, target, Conversion::Numeric { to }, false);
                return Some(Coerced {
                    expr: converted,
                    quality: q,
                });
            }
        }
        // T to U?: convert the payload, then wrap.
        if let Some(to_u) = target_desc.nullable_underlying() {
            if let (Some(from), Some(to)) = (NumericRank::of(expr.ty), NumericRank::of(to_u)) {
                let inner = self.coerce_numeric(expr, to_u, from, to);
                let wrapped = self.convert(inner.expr, target, Conversion::NullableWrap, false);
                return Some(Coerced {
                    expr: wrapped,
                    quality: inner.quality,
                });
            }
        }

        // 6. The conversion table.
        if let Some(entry) = self.universe.conversions().lookup(expr.ty, target) {
            if entry.is_natural {
                let upcast = self.convert(expr, target, Conversion::Reference, false);
                return Some(Coerced {
                    expr: upcast,
                    quality: quality::NATURAL,
                });
            }
            if let Some(op) = entry.implicit_op {
                let f = self.add_native(op);
                let converted = self.convert(expr, target, Conversion::Operator { f }, false);
                return Some(Coerced {
                    expr: converted,
                    quality: quality::IMPLICIT_OPERATOR,
                });
            }
            if explicit {
                if let Some(op) = entry.explicit_op {
                    let f = self.add_native(op);
                    let converted = self.convert(expr, target, Conversion::Operator { f }, false);
                    return Some(Coerced {
                        expr: converted,
                        quality: quality::EXPLICIT_OPERATOR,
                    });
                }
            }
        }

        // 7. Explicitly-requested downcast/unbox, checked at run time.
        if explicit && self.universe.is_assignable(target, expr.ty) {
            let unboxed = self.convert(expr, target, Conversion::Unbox, false);
            return Some(Coerced {
                expr: unboxed,
                quality: quality::EXPLICIT_OPERATOR,
            });
        }

        None
    }

    /// Numeric-to-numeric coercion, folding constants in place.
    fn coerce_numeric(
        &mut self,
        expr: &'b BoundExpr<'b>,
        target: TypeHash,
        from: NumericRank,
        to: NumericRank,
    ) -> Coerced<'b> {
        if let Some(value) = self.const_value(expr) {
            if let Some(folded) = value.cast_numeric(to, true) {
                let folded = self.constant(target, folded);
                return Coerced {
                    expr: folded,
                    quality: quality::IN_PLACE,
                };
            }
        }
        let q = if promote::is_widening(from, to) {
            quality::WIDENING
        } else {
            quality::NARROWING
        };
        let converted = self.convert(expr, target, Conversion::Numeric { to }, false);
        Coerced {
            expr: converted,
            quality: q,
        }
    }

    /// Coerce a nullable-typed operand's payload to another rank without
    /// disturbing nulls, for lifted operator operands.
    pub(crate) fn lift_numeric(
        &mut self,
        expr: &'b BoundExpr<'b>,
        rank: NumericRank,
    ) -> &'b BoundExpr<'b> {
        let underlying = self
            .universe
            .try_describe(expr.ty)
            .and_then(|d| d.nullable_underlying())
            .unwrap_or(expr.ty);
        if NumericRank::of(underlying) == Some(rank) {
            return expr;
        }
        let target = self.universe.nullable_of(rank.hash());
        self.convert(expr, target, Conversion::Numeric { to: rank }, false)
    }
}
