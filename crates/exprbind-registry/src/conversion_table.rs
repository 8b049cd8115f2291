//! The graded conversion cache.
//!
//! One [`ConversionDesc`] per (source, target) type pair, built up
//! incrementally as types are described and consulted by the binder when
//! coercing a value from one type to another. Merging is idempotent:
//! describing the same type twice produces no duplicate entries and never
//! downgrades an existing grade.
//!
//! ## Quality bands
//!
//! Highest to lowest: exact match 1.0 > natural (inheritance/interface)
//! 0.9 > in-place literal conversion 0.7 > user implicit operator 0.5 =
//! numeric widening 0.5 > numeric narrowing 0.4 > user explicit operator
//! 0.0 (cast-only) > incompatible (no entry). Enum/underlying and
//! nullable-wrap conversions are synthesized in place by the binder at the
//! in-place band and never appear in this table.

use std::sync::RwLock;

use rustc_hash::FxHashMap;

use exprbind_core::{NativeFn, TypeHash};

use crate::desc::TypeDesc;

/// The fixed quality bands for argument/operand matching.
pub mod quality {
    /// Operand type equals the target exactly.
    pub const EXACT: f64 = 1.0;
    /// Inheritance/interface compatibility; no operator call needed.
    pub const NATURAL: f64 = 0.9;
    /// A constant converted in place at bind time, or a synthesized
    /// enum/nullable wrap.
    pub const IN_PLACE: f64 = 0.7;
    /// User-defined implicit conversion operator.
    pub const IMPLICIT_OPERATOR: f64 = 0.5;
    /// Numeric widening.
    pub const WIDENING: f64 = 0.5;
    /// Numeric narrowing or precision loss.
    pub const NARROWING: f64 = 0.4;
    /// User-defined explicit operator: usable only under a cast node.
    pub const EXPLICIT_OPERATOR: f64 = 0.0;
}

/// Graded description of a (source, target) conversion.
#[derive(Clone)]
pub struct ConversionDesc {
    /// Best implicit grade available for this pair.
    pub quality: f64,
    /// Inheritance/interface compatibility: no operator call needed.
    pub is_natural: bool,
    /// User-defined implicit operator, if declared.
    pub implicit_op: Option<NativeFn>,
    /// User-defined explicit operator, if declared.
    pub explicit_op: Option<NativeFn>,
}

impl ConversionDesc {
    fn empty() -> Self {
        ConversionDesc {
            quality: quality::EXPLICIT_OPERATOR,
            is_natural: false,
            implicit_op: None,
            explicit_op: None,
        }
    }
}

/// Shared cache of graded conversions, keyed by (source, target).
///
/// Reads take a short-held read lock; population takes the write lock per
/// merged pair. Once a universe is fully described the table is effectively
/// read-only.
#[derive(Default)]
pub struct ConversionTable {
    entries: RwLock<FxHashMap<(TypeHash, TypeHash), ConversionDesc>>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the conversion for a (source, target) pair.
    pub fn lookup(&self, from: TypeHash, to: TypeHash) -> Option<ConversionDesc> {
        self.entries
            .read()
            .expect("conversion table lock poisoned")
            .get(&(from, to))
            .cloned()
    }

    /// Number of known pairs.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("conversion table lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record inheritance/interface compatibility for a pair.
    pub fn insert_natural(&self, from: TypeHash, to: TypeHash) {
        let mut entries = self.entries.write().expect("conversion table lock poisoned");
        let entry = entries.entry((from, to)).or_insert_with(ConversionDesc::empty);
        entry.is_natural = true;
        if entry.quality < quality::NATURAL {
            entry.quality = quality::NATURAL;
        }
    }

    /// Record a user-declared conversion operator for a pair.
    ///
    /// The first operator registered for a direction wins; re-merging the
    /// same type is a no-op.
    pub fn insert_operator(&self, from: TypeHash, to: TypeHash, implicit: bool, op: &NativeFn) {
        let mut entries = self.entries.write().expect("conversion table lock poisoned");
        let entry = entries.entry((from, to)).or_insert_with(ConversionDesc::empty);
        if implicit {
            if entry.implicit_op.is_none() {
                entry.implicit_op = Some(op.clone());
            }
            if entry.quality < quality::IMPLICIT_OPERATOR {
                entry.quality = quality::IMPLICIT_OPERATOR;
            }
        } else if entry.explicit_op.is_none() {
            entry.explicit_op = Some(op.clone());
        }
    }

    /// Merge every conversion operator declared on a type.
    pub fn merge_from_type(&self, desc: &TypeDesc) {
        for conv in &desc.operators.implicit_to {
            self.insert_operator(desc.hash, conv.other, true, &conv.invoke);
        }
        for conv in &desc.operators.explicit_to {
            self.insert_operator(desc.hash, conv.other, false, &conv.invoke);
        }
        for conv in &desc.operators.implicit_from {
            self.insert_operator(conv.other, desc.hash, true, &conv.invoke);
        }
        for conv in &desc.operators.explicit_from {
            self.insert_operator(conv.other, desc.hash, false, &conv.invoke);
        }
    }
}
