//! # Call data model: requests, canonical encoding, results.
//!
//! This module provides the types that travel through the backend:
//! - [`Value`] - dynamic argument supplied by the caller
//! - [`FunctionCall`] - function name plus arguments, as built by the caller
//! - [`CanonicalCall`] - validated, serializable form produced by [`encode`]
//! - [`ExecutionResult`] / [`Outcome`] - raw result produced by the execution host
//! - [`ResultEnvelope`] - raw result plus local timestamps, returned to the caller

mod codec;
mod result;
mod value;

pub use codec::{CanonicalCall, FunctionCall, encode};
pub use result::{ErrorDetails, ExecutionResult, Outcome, RawResponse, ResultEnvelope};
pub use value::{CallableFn, Value};
