//! exprbind — bind attributed expression trees against a host type
//! universe and evaluate them without generating code at run time.
//!
//! The pipeline is one-directional: a generic attributed syntax tree is
//! bound once against the universe (overload resolution, numeric/nullable/
//! enum promotion, null propagation), the typed graph is lowered once into
//! an immutable execution-node tree, and that tree is then evaluated
//! repeatedly — and concurrently — against per-call frames.
//!
//! ```
//! use exprbind::prelude::*;
//!
//! let engine = Engine::new();
//! let tree = SyntaxNode::new("Add")
//!     .with_node("left", SyntaxNode::new("Constant").with_int("value", 2))
//!     .with_node(
//!         "right",
//!         SyntaxNode::new("Constant").with_int("value", 3).with_str("type", "i64"),
//!     );
//! let compiled = engine.compile(&tree, &Signature::new()).unwrap();
//! assert_eq!(compiled.evaluate(&[]).unwrap(), Value::I64(5));
//! ```

use std::sync::Arc;

use bumpalo::Bump;

use exprbind_binder::{Signature, bind};
use exprbind_core::{BindError, SyntaxNode};
use exprbind_engine::{CompiledExpr, compile};
use exprbind_registry::TypeUniverse;

pub use exprbind_binder as binder;
pub use exprbind_core as core;
pub use exprbind_engine as engine;
pub use exprbind_registry as registry;

/// One-stop imports for embedding hosts.
pub mod prelude {
    pub use exprbind_binder::Signature;
    pub use exprbind_core::{
        AttrValue, BinaryOp, BindError, EvalError, NativeError, NativeFn, NodeKind, NumericRank,
        Span, SyntaxNode, TypeHash, UnaryOp, Value, primitives,
    };
    pub use exprbind_engine::CompiledExpr;
    pub use exprbind_registry::{
        ClassBuilder, EnumBuilder, InterfaceBuilder, MemberDesc, ParamDesc, TypeDesc,
        TypeProvider, TypeUniverse,
    };

    pub use crate::Engine;
}

/// The embedding entry point: a shared type universe plus bind-and-compile
/// in one call.
///
/// An `Engine` is cheap to clone-by-reference (`Arc` the universe) and
/// thread-safe; binding reads the universe, evaluation reads only the
/// compiled tree.
pub struct Engine {
    universe: Arc<TypeUniverse>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine over a fresh universe with only the primitives seeded.
    pub fn new() -> Self {
        Engine {
            universe: Arc::new(TypeUniverse::new()),
        }
    }

    /// An engine over a universe the host has already populated.
    pub fn with_universe(universe: Arc<TypeUniverse>) -> Self {
        Engine { universe }
    }

    /// The universe this engine binds against.
    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }

    /// Bind a syntax tree and lower it to a reusable evaluator.
    ///
    /// The bound graph's arena lives only for the duration of this call;
    /// the compiled expression owns everything it needs.
    pub fn compile(
        &self,
        tree: &SyntaxNode,
        signature: &Signature,
    ) -> Result<CompiledExpr, BindError> {
        let arena = Bump::new();
        let program = bind(&self.universe, &arena, tree, signature)?;
        Ok(compile(&program, &self.universe))
    }
}
