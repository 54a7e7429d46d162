//! # Execution host: modules, functions, and the executor of canonical calls.
//!
//! - [`Function`] - async function trait; [`FunctionFn`] closure-backed impl
//! - [`Args`] - positional canonical arguments with typed access
//! - [`Module`] - named set of functions (what a remote backend would deploy)
//! - [`ExecutionHost`] - runs a [`CanonicalCall`](crate::CanonicalCall) against a module

mod function;
mod host;
mod module;

pub use function::{Args, Function, FunctionFn, FunctionRef};
pub use host::ExecutionHost;
pub use module::Module;
