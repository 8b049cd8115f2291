//! Per-bind-call state: the declared signature and parameter scoping.

use exprbind_core::TypeHash;
use rustc_hash::FxHashMap;

/// The declared shape of an expression being bound.
///
/// Parameters become frame slots in declaration order. When an implicit
/// root type is supplied, member access without a target resolves against
/// it and the root value occupies the first frame slot, ahead of the
/// declared parameters.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<(String, TypeHash)>,
    /// Expected result type; the bound root is coerced to it when present.
    pub result: Option<TypeHash>,
    /// Implicit-this root type for target-less member access.
    pub this_root: Option<TypeHash>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeHash) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    pub fn returning(mut self, ty: TypeHash) -> Self {
        self.result = Some(ty);
        self
    }

    pub fn with_root(mut self, ty: TypeHash) -> Self {
        self.this_root = Some(ty);
        self
    }

    /// Number of frame slots the evaluator will expect as arguments.
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.this_root.is_some())
    }
}

/// Slot allocation for declared and lambda parameters.
///
/// Lambda parameters shadow outer names while their scope is open; slots
/// are never reused, so every parameter in the whole expression owns a
/// distinct frame slot.
pub(crate) struct Scopes {
    outer: FxHashMap<String, (usize, TypeHash)>,
    lambda: Vec<FxHashMap<String, (usize, TypeHash)>>,
    next_slot: usize,
}

impl Scopes {
    /// Allocate slots for a signature. Returns the scope set and the slot
    /// of the implicit root, if any.
    pub fn new(sig: &Signature) -> (Self, Option<(usize, TypeHash)>) {
        let mut outer = FxHashMap::default();
        let mut next_slot = 0usize;
        let this_slot = sig.this_root.map(|ty| {
            let slot = next_slot;
            next_slot += 1;
            (slot, ty)
        });
        for (name, ty) in &sig.params {
            outer.insert(name.clone(), (next_slot, *ty));
            next_slot += 1;
        }
        (
            Scopes {
                outer,
                lambda: Vec::new(),
                next_slot,
            },
            this_slot,
        )
    }

    /// Resolve a parameter name, innermost lambda scope first.
    pub fn lookup(&self, name: &str) -> Option<(usize, TypeHash)> {
        for scope in self.lambda.iter().rev() {
            if let Some(found) = scope.get(name) {
                return Some(*found);
            }
        }
        self.outer.get(name).copied()
    }

    /// Open a lambda scope, allocating one fresh slot per parameter.
    pub fn push_lambda(&mut self, params: &[(String, TypeHash)]) -> Vec<usize> {
        let mut scope = FxHashMap::default();
        let mut slots = Vec::with_capacity(params.len());
        for (name, ty) in params {
            let slot = self.next_slot;
            self.next_slot += 1;
            scope.insert(name.clone(), (slot, *ty));
            slots.push(slot);
        }
        self.lambda.push(scope);
        slots
    }

    pub fn pop_lambda(&mut self) {
        self.lambda.pop();
    }

    /// Total slots allocated so far.
    pub fn slot_count(&self) -> usize {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprbind_core::primitives;

    #[test]
    fn root_takes_the_first_slot() {
        let sig = Signature::new()
            .with_root(primitives::OBJECT)
            .param("x", primitives::I32);
        let (scopes, this_slot) = Scopes::new(&sig);
        assert_eq!(this_slot, Some((0, primitives::OBJECT)));
        assert_eq!(scopes.lookup("x"), Some((1, primitives::I32)));
        assert_eq!(sig.arg_count(), 2);
    }

    #[test]
    fn lambda_params_shadow_and_get_fresh_slots() {
        let sig = Signature::new().param("x", primitives::I32);
        let (mut scopes, _) = Scopes::new(&sig);
        let slots = scopes.push_lambda(&[("x".into(), primitives::F64)]);
        assert_eq!(slots, vec![1]);
        assert_eq!(scopes.lookup("x"), Some((1, primitives::F64)));
        scopes.pop_lambda();
        assert_eq!(scopes.lookup("x"), Some((0, primitives::I32)));
        assert_eq!(scopes.slot_count(), 2);
    }
}
