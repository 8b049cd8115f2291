//! The per-call evaluation frame.
//!
//! A [`Frame`] is the only mutable state touched during one evaluation: the
//! constant pool captured at compile time plus a locals array. The first
//! two locals are reserved scratch slots used to thread the current
//! instance through member/list-initializer sub-trees; declared parameters
//! and lambda parameters follow.

use std::sync::Arc;

use exprbind_core::Value;

/// Reserved scratch slots at the front of every frame's locals.
pub const SCRATCH_SLOTS: usize = 2;

/// Per-call mutable evaluation state. Never shared between calls.
pub struct Frame {
    pub(crate) consts: Arc<[Value]>,
    pub(crate) locals: Vec<Value>,
}

impl Frame {
    pub(crate) fn new(consts: Arc<[Value]>, local_count: usize) -> Self {
        Frame {
            consts,
            locals: vec![Value::Null; local_count],
        }
    }

    #[inline]
    pub(crate) fn constant(&self, slot: usize) -> Value {
        self.consts[slot].clone()
    }

    #[inline]
    pub(crate) fn local(&self, slot: usize) -> Value {
        self.locals[slot].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_starts_null() {
        let consts: Arc<[Value]> = Arc::from(vec![Value::I32(7)]);
        let frame = Frame::new(consts, SCRATCH_SLOTS + 1);
        assert_eq!(frame.local(0), Value::Null);
        assert_eq!(frame.local(SCRATCH_SLOTS), Value::Null);
        assert_eq!(frame.constant(0), Value::I32(7));
    }
}
