//! # Callable functions and their arguments.
//!
//! [`Function`] is the unit a [`Module`](crate::Module) exports. The common handle
//! type is [`FunctionRef`], an `Arc<dyn Function>` shared by the module and the host.
//! [`FunctionFn`] wraps a closure that creates a fresh future per call.
//!
//! ## Example
//! ```rust
//! use immediate::{Args, FunctionFn, FunctionRef};
//!
//! let add: FunctionRef = FunctionFn::arc("add", |args: Args| async move {
//!     let a: i64 = args.get(0)?;
//!     let b: i64 = args.get(1)?;
//!     anyhow::Ok(serde_json::json!(a + b))
//! });
//! assert_eq!(add.name(), "add");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Shared handle to a function.
pub type FunctionRef = Arc<dyn Function>;

/// # Asynchronous function exported by a module.
///
/// Errors are ordinary return values: the host captures them into the result
/// envelope instead of failing the call.
#[async_trait]
pub trait Function: Send + Sync + 'static {
    /// Name the function is called by.
    fn name(&self) -> &str;

    /// Runs the function with already-decoded canonical arguments.
    async fn call(&self, args: Args) -> anyhow::Result<serde_json::Value>;
}

/// Function-backed implementation of [`Function`].
pub struct FunctionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FunctionFn<F> {
    /// Creates a new function-backed function.
    ///
    /// Prefer [`FunctionFn::arc`] when you immediately need a [`FunctionRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the function and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Function for FunctionFn<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: Args) -> anyhow::Result<serde_json::Value> {
        (self.f)(args).await
    }
}

/// Positional arguments of a canonical call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: Vec<serde_json::Value>,
}

impl Args {
    pub fn new(values: Vec<serde_json::Value>) -> Self {
        Self { values }
    }

    /// Deserializes argument `index`.
    ///
    /// # Errors
    /// Fails if the argument is missing or has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let raw = self
            .values
            .get(index)
            .with_context(|| format!("missing argument {index}"))?;
        T::deserialize(raw).with_context(|| format!("invalid argument {index}"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw JSON arguments.
    pub fn raw(&self) -> &[serde_json::Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn closure_function_receives_args() {
        let greet = FunctionFn::arc("greet", |args: Args| async move {
            let who: String = args.get(0)?;
            anyhow::Ok(json!(format!("hello {who}")))
        });
        let out = greet.call(Args::new(vec![json!("world")])).await.unwrap();
        assert_eq!(out, json!("hello world"));
    }

    #[test]
    fn missing_and_mistyped_arguments_are_errors() {
        let args = Args::new(vec![json!("x")]);
        let err = args.get::<i64>(0).unwrap_err();
        assert!(err.to_string().contains("invalid argument 0"));
        let err = args.get::<i64>(3).unwrap_err();
        assert!(err.to_string().contains("missing argument 3"));
        assert_eq!(args.len(), 1);
        assert!(!args.is_empty());
    }
}
