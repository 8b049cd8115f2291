//! Type-erased bridge to host-supplied member implementations.
//!
//! Every field getter, property accessor, method, constructor, indexer, and
//! conversion operator the host registers is stored as a [`NativeFn`]: a
//! shared callable taking an optional receiver plus an argument slice. The
//! uniform shape lets the registry store members of any signature in one
//! table and lets execution nodes hold a pre-resolved handle with no name
//! lookup at run time.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;
use crate::value::Value;

/// Result of a host callback.
pub type NativeResult = Result<Value, NativeError>;

/// A shared, type-erased host callable.
///
/// Instance members receive `Some(receiver)`; static members, constructors,
/// and conversion operators receive `None`. Cloning shares the underlying
/// callable.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn Fn(Option<&Value>, &[Value]) -> NativeResult + Send + Sync>,
}

impl NativeFn {
    /// Wrap a callable.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        NativeFn { inner: Arc::new(f) }
    }

    /// Wrap an instance getter (`receiver -> value`).
    ///
    /// A missing receiver is reported as a host error; the engine never
    /// calls an instance member without one.
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn(&Value) -> NativeResult + Send + Sync + 'static,
    {
        Self::new(move |recv, _args| {
            let recv = recv.ok_or_else(|| NativeError::msg("instance member called without receiver"))?;
            f(recv)
        })
    }

    /// Wrap an instance method (`receiver, args -> value`).
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        Self::new(move |recv, args| {
            let recv = recv.ok_or_else(|| NativeError::msg("instance member called without receiver"))?;
            f(recv, args)
        })
    }

    /// Wrap a receiverless callable (static method, constructor, operator).
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> NativeResult + Send + Sync + 'static,
    {
        Self::new(move |_recv, args| f(args))
    }

    /// Invoke the callable.
    pub fn call(&self, receiver: Option<&Value>, args: &[Value]) -> NativeResult {
        (self.inner)(receiver, args)
    }

    /// Whether two handles share the same underlying callable.
    pub fn same_as(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_ignores_receiver() {
        let add = NativeFn::function(|args: &[Value]| match (&args[0], &args[1]) {
            (Value::I32(a), Value::I32(b)) => Ok(Value::I32(a + b)),
            _ => Err(NativeError::msg("expected two i32s")),
        });
        let out = add.call(None, &[Value::I32(2), Value::I32(3)]).unwrap();
        assert_eq!(out, Value::I32(5));
    }

    #[test]
    fn getter_requires_receiver() {
        let get = NativeFn::getter(|recv: &Value| Ok(recv.clone()));
        assert!(get.call(None, &[]).is_err());
        assert_eq!(get.call(Some(&Value::Bool(true)), &[]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn clones_share_identity() {
        let f = NativeFn::function(|_| Ok(Value::Null));
        let g = f.clone();
        assert!(f.same_as(&g));
        let h = NativeFn::function(|_| Ok(Value::Null));
        assert!(!f.same_as(&h));
    }
}
