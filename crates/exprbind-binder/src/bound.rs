//! The bound expression graph.
//!
//! Binding produces a typed, immutable tree of [`BoundExpr`] nodes allocated
//! in a bump arena. Nodes are plain `Copy` data: constants, resolved
//! members, and conversion operators live in `Vec`-backed side tables on the
//! [`BoundProgram`], referenced by index. That keeps the arena free of
//! droppable payloads and makes the graph trivially walkable by the
//! execution-engine lowering pass.

use exprbind_core::{BinaryOp, NativeFn, NumericRank, TypeHash, UnaryOp, Value};
use exprbind_registry::MemberDesc;

/// Index into [`BoundProgram::consts`].
pub type ConstId = u32;
/// Index into [`BoundProgram::members`].
pub type MemberId = u32;
/// Index into [`BoundProgram::natives`].
pub type NativeId = u32;

/// A typed bound expression node.
#[derive(Debug, Clone, Copy)]
pub struct BoundExpr<'b> {
    /// Static result type of this node.
    pub ty: TypeHash,
    pub kind: BoundKind<'b>,
}

/// The bound expression forms.
#[derive(Debug, Clone, Copy)]
pub enum BoundKind<'b> {
    /// A literal or folded constant from the constant pool.
    Constant(ConstId),
    /// A declared parameter (or the implicit root), by frame slot.
    Parameter { slot: usize },
    /// Field or property access; `target` is `None` for statics.
    Field {
        target: Option<&'b BoundExpr<'b>>,
        member: MemberId,
    },
    /// Method call; `target` is `None` for statics.
    Call {
        target: Option<&'b BoundExpr<'b>>,
        member: MemberId,
        args: &'b [&'b BoundExpr<'b>],
    },
    /// Indexer access on a non-array type.
    Indexer {
        target: &'b BoundExpr<'b>,
        member: MemberId,
        args: &'b [&'b BoundExpr<'b>],
    },
    /// Array element access, one index per dimension.
    ArrayIndex {
        target: &'b BoundExpr<'b>,
        indices: &'b [&'b BoundExpr<'b>],
    },
    /// Constructor invocation.
    Ctor {
        member: MemberId,
        args: &'b [&'b BoundExpr<'b>],
    },
    /// Eager binary operation.
    Binary {
        op: BinaryOp,
        mode: BinaryMode,
        lhs: &'b BoundExpr<'b>,
        rhs: &'b BoundExpr<'b>,
    },
    /// Unary operation.
    Unary {
        op: UnaryOp,
        mode: UnaryMode,
        operand: &'b BoundExpr<'b>,
    },
    /// Short-circuit `&&` / `||`.
    Logical {
        and: bool,
        lhs: &'b BoundExpr<'b>,
        rhs: &'b BoundExpr<'b>,
    },
    /// Null-coalescing `??`.
    Coalesce {
        lhs: &'b BoundExpr<'b>,
        rhs: &'b BoundExpr<'b>,
    },
    /// Ternary conditional.
    Condition {
        test: &'b BoundExpr<'b>,
        if_true: &'b BoundExpr<'b>,
        if_false: &'b BoundExpr<'b>,
    },
    /// Conversion to this node's type.
    Convert {
        input: &'b BoundExpr<'b>,
        conversion: Conversion,
        checked: bool,
    },
    /// Runtime type test.
    TypeIs {
        input: &'b BoundExpr<'b>,
        target: TypeHash,
    },
    /// Runtime checked cast yielding null on mismatch.
    TypeAs {
        input: &'b BoundExpr<'b>,
        target: TypeHash,
    },
    /// Total element count of an array.
    ArrayLength { input: &'b BoundExpr<'b> },
    /// Array allocation from per-dimension bounds, default-filled.
    NewArrayBounds {
        elem: TypeHash,
        bounds: &'b [&'b BoundExpr<'b>],
    },
    /// Single-dimension array from element expressions.
    NewArrayInit {
        elem: TypeHash,
        items: &'b [&'b BoundExpr<'b>],
    },
    /// Construction followed by member assignments; each binding carries
    /// the member's setter handle.
    MemberInit {
        ctor: &'b BoundExpr<'b>,
        bindings: &'b [(NativeId, &'b BoundExpr<'b>)],
    },
    /// Construction followed by add-method calls.
    ListInit {
        ctor: &'b BoundExpr<'b>,
        adds: &'b [(MemberId, &'b [&'b BoundExpr<'b>])],
    },
    /// A lambda literal; `slots` are the frame slots of its parameters.
    Lambda {
        slots: &'b [usize],
        body: &'b BoundExpr<'b>,
    },
    /// Application of a lambda-typed expression.
    Invoke {
        target: &'b BoundExpr<'b>,
        args: &'b [&'b BoundExpr<'b>],
    },
    /// A quoted (unevaluated) lambda.
    Quote { inner: &'b BoundExpr<'b> },
    /// Null-propagation guard: evaluate `body` only when every target is
    /// non-null, in registration order; otherwise yield the null default.
    NullGuard {
        targets: &'b [&'b BoundExpr<'b>],
        body: &'b BoundExpr<'b>,
    },
}

/// How a binary operation executes.
#[derive(Debug, Clone, Copy)]
pub enum BinaryMode {
    /// Builtin numeric operation at a promoted rank.
    ///
    /// `lifted` marks nullable operands: arithmetic yields null when either
    /// side is null, comparisons yield their fixed null results.
    Numeric { rank: NumericRank, lifted: bool },
    /// Enum arithmetic through the underlying rank, result re-wrapped as
    /// the enum type.
    EnumArith {
        enum_ty: TypeHash,
        rank: NumericRank,
        lifted: bool,
    },
    /// Non-short-circuit boolean `&`, `|`, `^`.
    Bool,
    /// String concatenation.
    Concat,
    /// Structural/reference equality on non-numeric operands.
    Equality,
    /// User-declared operator overload.
    Operator { f: NativeId },
}

/// How a unary operation executes.
#[derive(Debug, Clone, Copy)]
pub enum UnaryMode {
    Numeric { rank: NumericRank, lifted: bool },
    /// Complement of an enum value through its underlying rank.
    EnumComplement { enum_ty: TypeHash, rank: NumericRank },
    Bool,
}

/// A bound conversion step.
#[derive(Debug, Clone, Copy)]
pub enum Conversion {
    /// Pure retyping; no runtime effect.
    Identity,
    /// Numeric rank change. Null passes through untouched so lifted
    /// operands keep their emptiness.
    Numeric { to: NumericRank },
    /// Enum to its underlying integer (or another numeric rank).
    EnumToUnderlying { to: NumericRank },
    /// Integer re-wrapped as an enum value.
    UnderlyingToEnum { enum_ty: TypeHash },
    /// `T` to `T?`; no runtime effect.
    NullableWrap,
    /// `T?` to `T`; null raises a null-dereference.
    NullableUnwrap,
    /// Static reference up-conversion; no runtime effect.
    Reference,
    /// Runtime-checked down-conversion: null raises a null-dereference
    /// for value targets, a mismatched runtime type raises invalid-cast.
    Unbox,
    /// User-declared conversion operator.
    Operator { f: NativeId },
}

/// The output of a bind call: the graph root plus its side tables.
pub struct BoundProgram<'b> {
    pub root: &'b BoundExpr<'b>,
    /// Declared parameters (including the implicit root when present).
    pub param_count: usize,
    /// Total frame slots: declared parameters plus lambda parameters.
    pub slot_count: usize,
    /// Constants captured at bind time.
    pub consts: Vec<Value>,
    /// Resolved member descriptions referenced by the graph.
    pub members: Vec<MemberDesc>,
    /// Conversion/operator handles referenced by the graph.
    pub natives: Vec<NativeFn>,
}
