//! Overload resolution for calls, constructors, and indexers.
//!
//! ## Algorithm
//!
//! 1. For each candidate in declaration order, bind every argument to a
//!    parameter — by position or by name, never both for one parameter.
//! 2. Grade each bound argument through the coercion ladder; a candidate
//!    dies outright if any required parameter stays unfilled or any
//!    argument refuses to coerce.
//! 3. Missing optional parameters are filled from their declared defaults
//!    at the lowest usable band.
//! 4. The candidate with the highest mean per-parameter quality wins; ties
//!    go to the earliest declared; a perfect mean short-circuits the rest.

use ordered_float::OrderedFloat;

use exprbind_core::{BindError, Span};
use exprbind_registry::{MemberDesc, quality};

use crate::bound::{BoundExpr, MemberId};
use crate::expr::Binder;

/// Arguments at a call site, positional plus named.
#[derive(Default)]
pub(crate) struct ArgBag<'b> {
    pub positional: Vec<&'b BoundExpr<'b>>,
    pub named: Vec<(String, &'b BoundExpr<'b>)>,
}

impl<'b> ArgBag<'b> {
    pub fn positional(args: Vec<&'b BoundExpr<'b>>) -> Self {
        ArgBag {
            positional: args,
            named: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }
}

/// A resolved call: the winning member and its coerced argument row.
pub(crate) struct CallPlan<'b> {
    pub member: MemberId,
    pub result: exprbind_core::TypeHash,
    pub args: Vec<&'b BoundExpr<'b>>,
    /// Mean per-parameter quality of the winning candidate.
    pub score: f64,
}

impl<'b, 'u> Binder<'b, 'u> {
    /// Select the best candidate for an argument bag.
    ///
    /// `what` names the member for error messages. The no-overload error is
    /// raised only after every candidate has been tried and rejected.
    pub(crate) fn resolve_overload(
        &mut self,
        candidates: &[MemberDesc],
        bag: &ArgBag<'b>,
        span: Option<Span>,
        what: &str,
    ) -> Result<CallPlan<'b>, BindError> {
        let mut best: Option<(usize, Vec<&'b BoundExpr<'b>>, f64)> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let Some((args, score)) = self.try_candidate(candidate, bag) else {
                continue;
            };
            // First-declared wins ties: only a strictly better mean replaces.
            let replace = match &best {
                Some((_, _, best_score)) => OrderedFloat(score) > OrderedFloat(*best_score),
                None => true,
            };
            if replace {
                let perfect = score == quality::EXACT;
                best = Some((index, args, score));
                if perfect {
                    break;
                }
            }
        }

        match best {
            Some((index, args, score)) => {
                let member = candidates[index].clone();
                let result = member.result;
                let member = self.add_member(member);
                Ok(CallPlan {
                    member,
                    result,
                    args,
                    score,
                })
            }
            None => Err(BindError::NoMatchingOverload {
                name: what.to_owned(),
                args: self.describe_bag(bag),
                span,
            }),
        }
    }

    /// Attempt one candidate: fill its parameter row and grade it.
    fn try_candidate(
        &mut self,
        candidate: &MemberDesc,
        bag: &ArgBag<'b>,
    ) -> Option<(Vec<&'b BoundExpr<'b>>, f64)> {
        let params = &candidate.params;
        if bag.len() > params.len() {
            return None;
        }

        let mut filled: Vec<Option<(&'b BoundExpr<'b>, f64)>> = vec![None; params.len()];

        for (position, arg) in bag.positional.iter().enumerate() {
            let param = params.get(position)?;
            let coerced = self.coerce(arg, param.param_type, false)?;
            filled[position] = Some((coerced.expr, coerced.quality));
        }

        for (name, arg) in &bag.named {
            let position = params.iter().position(|p| &p.name == name)?;
            // By position or by name, never both for the same parameter.
            if filled[position].is_some() {
                return None;
            }
            let coerced = self.coerce(*arg, params[position].param_type, false)?;
            filled[position] = Some((coerced.expr, coerced.quality));
        }

        let mut args = Vec::with_capacity(params.len());
        let mut total = 0.0f64;
        for (param, slot) in params.iter().zip(filled) {
            match slot {
                Some((expr, q)) => {
                    total += q;
                    args.push(expr);
                }
                None => {
                    // Defaults fill at the lowest usable band.
                    let default = param.default.clone()?;
                    total += quality::NARROWING;
                    args.push(self.constant(param.param_type, default));
                }
            }
        }

        let score = if params.is_empty() {
            quality::EXACT
        } else {
            total / params.len() as f64
        };
        Some((args, score))
    }

    fn describe_bag(&self, bag: &ArgBag<'b>) -> String {
        let mut parts: Vec<String> = bag
            .positional
            .iter()
            .map(|a| self.type_name(a.ty))
            .collect();
        parts.extend(
            bag.named
                .iter()
                .map(|(n, a)| format!("{n}: {}", self.type_name(a.ty))),
        );
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    use exprbind_core::{NativeFn, Value, primitives};
    use exprbind_registry::{MemberFlags, MemberKind, ParamDesc, TypeUniverse};

    use crate::context::{Scopes, Signature};

    fn method(name: &str, params: Vec<ParamDesc>) -> MemberDesc {
        MemberDesc {
            name: name.into(),
            kind: MemberKind::Method,
            flags: MemberFlags::STATIC,
            declaring: primitives::OBJECT,
            params,
            result: primitives::I32,
            invoke: NativeFn::function(|_args| Ok(Value::Null)),
            set: None,
        }
    }

    fn with_binder<R>(f: impl for<'b> FnOnce(&mut Binder<'b, '_>) -> R) -> R {
        let universe = TypeUniverse::new();
        let arena = Bump::new();
        let (scopes, this_slot) = Scopes::new(&Signature::new());
        let mut binder = Binder {
            arena: &arena,
            universe: &universe,
            scopes,
            this_slot,
            null_targets: Vec::new(),
            consts: Vec::new(),
            members: Vec::new(),
            natives: Vec::new(),
        };
        f(&mut binder)
    }

    #[test]
    fn named_argument_binds_by_name() {
        with_binder(|binder| {
            let candidate = method(
                "f",
                vec![
                    ParamDesc::new("a", primitives::I32),
                    ParamDesc::new("b", primitives::I32),
                ],
            );
            let first = binder.constant(primitives::I32, Value::I32(1));
            let second = binder.constant(primitives::I32, Value::I32(2));
            let bag = ArgBag {
                positional: vec![first],
                named: vec![("b".into(), second)],
            };
            let plan = binder
                .resolve_overload(&[candidate], &bag, None, "f")
                .expect("named argument should bind");
            assert_eq!(plan.args.len(), 2);
            assert_eq!(plan.score, quality::EXACT);
        });
    }

    #[test]
    fn position_and_name_never_both_fill_one_parameter() {
        with_binder(|binder| {
            let candidate = method("f", vec![ParamDesc::new("a", primitives::I32)]);
            let first = binder.constant(primitives::I32, Value::I32(1));
            let second = binder.constant(primitives::I32, Value::I32(2));
            let bag = ArgBag {
                positional: vec![first],
                named: vec![("a".into(), second)],
            };
            let err = binder.resolve_overload(&[candidate], &bag, None, "f");
            assert!(matches!(err, Err(BindError::NoMatchingOverload { .. })));
        });
    }

    #[test]
    fn missing_optional_parameter_fills_from_default() {
        with_binder(|binder| {
            let candidate = method(
                "f",
                vec![
                    ParamDesc::new("a", primitives::I32),
                    ParamDesc::with_default("b", primitives::I32, Value::I32(10)),
                ],
            );
            let first = binder.constant(primitives::I32, Value::I32(1));
            let bag = ArgBag::positional(vec![first]);
            let plan = binder
                .resolve_overload(&[candidate], &bag, None, "f")
                .expect("default should fill");
            assert_eq!(plan.args.len(), 2);
            // The filled default scores at the lowest band, dragging the
            // mean below perfect.
            assert!(plan.score < quality::EXACT);
            assert_eq!(
                binder.const_value(plan.args[1]),
                Some(&Value::I32(10))
            );
        });
    }

    #[test]
    fn missing_required_parameter_rejects_the_candidate() {
        with_binder(|binder| {
            let candidate = method(
                "f",
                vec![
                    ParamDesc::new("a", primitives::I32),
                    ParamDesc::new("b", primitives::I32),
                ],
            );
            let first = binder.constant(primitives::I32, Value::I32(1));
            let bag = ArgBag::positional(vec![first]);
            let err = binder.resolve_overload(&[candidate], &bag, None, "f");
            assert!(matches!(err, Err(BindError::NoMatchingOverload { .. })));
        });
    }

    #[test]
    fn ties_go_to_the_first_declared_candidate() {
        with_binder(|binder| {
            let a = method("f", vec![ParamDesc::new("x", primitives::I64)]);
            let b = method("f", vec![ParamDesc::new("x", primitives::I64)]);
            let arg = binder.constant(primitives::I64, Value::I64(1));
            let bag = ArgBag::positional(vec![arg]);
            let plan = binder
                .resolve_overload(&[a, b], &bag, None, "f")
                .expect("one of the twins should win");
            // Member ids are handed out in resolution order: the winner is
            // the first candidate pushed into the member table.
            assert_eq!(plan.member, 0);
        });
    }
}
