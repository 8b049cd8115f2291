//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is a 64-bit hash identifying a type in the universe. Hashes
//! for named types are computed from the qualified name, so the same name
//! always yields the same identity regardless of registration order, and a
//! reference to a not-yet-registered type can be formed before the type is
//! described. Derived identities (nullable wrappers, arrays, lambda
//! signatures) are computed from their component hashes with domain-specific
//! seeds so the derivations never collide with named types.
//!
//! Well-known primitive types use reserved literal identities below `0x100`
//! (see [`crate::primitives`]); xxh64 output landing in that range is not a
//! practical concern.

use std::fmt;

use xxhash_rust::xxh64::xxh64;

/// Hashing seeds separating identity domains.
///
/// Each derivation domain gets its own seed so e.g. `nullable_of(T)` can
/// never equal `array_of(T, 1)` or a named type's hash.
mod seeds {
    /// Named types hashed from their qualified name.
    pub const TYPE: u64 = 0x7c52_9d14_a0e3_86fb;
    /// Nullable wrapper derived from an underlying type.
    pub const NULLABLE: u64 = 0x3b81_f2ac_55d0_94e7;
    /// Array derived from an element type; the rank is mixed in.
    pub const ARRAY: u64 = 0xd40a_6c93_12bf_78e5;
    /// Lambda signature derived from parameter and result types.
    pub const LAMBDA: u64 = 0x91e6_03d7_cba8_4f12;
}

/// A deterministic 64-bit identity for a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid identity.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Identity of a named type.
    ///
    /// The same name always produces the same hash:
    ///
    /// ```
    /// use exprbind_core::TypeHash;
    ///
    /// assert_eq!(TypeHash::from_name("Point"), TypeHash::from_name("Point"));
    /// assert_ne!(TypeHash::from_name("Point"), TypeHash::from_name("Line"));
    /// ```
    pub fn from_name(name: &str) -> Self {
        TypeHash(xxh64(name.as_bytes(), seeds::TYPE))
    }

    /// Identity of the nullable wrapper around this type.
    pub fn nullable_of(self) -> Self {
        TypeHash(xxh64(&self.0.to_le_bytes(), seeds::NULLABLE))
    }

    /// Identity of an array with this element type and the given rank.
    pub fn array_of(self, rank: u32) -> Self {
        TypeHash(xxh64(
            &self.0.to_le_bytes(),
            seeds::ARRAY.wrapping_add(u64::from(rank)),
        ))
    }

    /// Identity of a lambda signature.
    ///
    /// Parameter order matters; the result type is mixed in last.
    pub fn lambda_of(params: &[TypeHash], result: TypeHash) -> Self {
        let mut acc = seeds::LAMBDA;
        for p in params {
            acc = xxh64(&p.0.to_le_bytes(), acc);
        }
        TypeHash(xxh64(&result.0.to_le_bytes(), acc))
    }

    /// Whether this is the empty identity.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_hash_is_deterministic() {
        assert_eq!(TypeHash::from_name("Widget"), TypeHash::from_name("Widget"));
        assert_ne!(TypeHash::from_name("Widget"), TypeHash::from_name("widget"));
    }

    #[test]
    fn derivations_do_not_collide() {
        let t = TypeHash::from_name("Widget");
        assert_ne!(t.nullable_of(), t);
        assert_ne!(t.array_of(1), t);
        assert_ne!(t.array_of(1), t.array_of(2));
        assert_ne!(t.nullable_of(), t.array_of(1));
    }

    #[test]
    fn lambda_signature_is_order_sensitive() {
        let a = TypeHash::from_name("A");
        let b = TypeHash::from_name("B");
        let r = TypeHash::from_name("R");
        assert_eq!(TypeHash::lambda_of(&[a, b], r), TypeHash::lambda_of(&[a, b], r));
        assert_ne!(TypeHash::lambda_of(&[a, b], r), TypeHash::lambda_of(&[b, a], r));
        assert_ne!(TypeHash::lambda_of(&[a], r), TypeHash::lambda_of(&[a], b));
    }
}
