//! # Execution host: runs canonical calls against a module.
//!
//! ```text
//! execute(call, start)
//!   ├─► module.get(call.name) ── None ──► Err(HostError::NotFound)
//!   ├─► function.call(args)   (panic caught)
//!   │       ├─ Ok(value)  ──► Ok(ExecutionResult { Returned(value), end = now })
//!   │       ├─ Err(e)     ──► Err(HostError::Target(e))
//!   │       └─ panic      ──► Err(HostError::Panicked)
//!   ▼
//! create_error_response(err, call, start) ──► ExecutionResult { Error(details), end = now }
//! ```
//!
//! The host never decides what a failure means for the caller; the lifecycle
//! controller turns every `HostError` into data with `create_error_response`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use futures::FutureExt;

use crate::call::{CanonicalCall, ErrorDetails, ExecutionResult, Outcome};
use crate::error::{HostError, panic_message};
use crate::host::function::Args;
use crate::host::module::Module;

/// Owns a loaded module and executes calls against it.
#[derive(Debug)]
pub struct ExecutionHost {
    module: Module,
    executions: AtomicU64,
}

impl ExecutionHost {
    /// Loads `module` into a new host.
    pub fn new(module: Module) -> Self {
        Self {
            module,
            executions: AtomicU64::new(0),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Number of results produced so far (successes and errors).
    pub fn executions(&self) -> u64 {
        self.executions.load(AtomicOrdering::Relaxed)
    }

    /// Executes `call`, stamping the result with `start` and the completion time.
    ///
    /// # Errors
    /// Any [`HostError`]; pass it to [`create_error_response`](Self::create_error_response).
    pub async fn execute(
        &self,
        call: &CanonicalCall,
        start: SystemTime,
    ) -> Result<ExecutionResult, HostError> {
        let function = self
            .module
            .get(call.name())
            .ok_or_else(|| HostError::NotFound {
                name: call.name().to_string(),
            })?;

        let args = Args::new(call.args().to_vec());
        let value = AssertUnwindSafe(function.call(args))
            .catch_unwind()
            .await
            .map_err(|payload| HostError::Panicked {
                message: panic_message(&*payload),
            })??;

        Ok(self.result(call, Outcome::Returned(value), start))
    }

    /// Builds the error variant of [`ExecutionResult`] for a failed execution.
    pub fn create_error_response(
        &self,
        err: HostError,
        call: &CanonicalCall,
        start: SystemTime,
    ) -> ExecutionResult {
        self.result(call, Outcome::Error(ErrorDetails::from(&err)), start)
    }

    fn result(&self, call: &CanonicalCall, outcome: Outcome, start: SystemTime) -> ExecutionResult {
        ExecutionResult {
            call_id: call.call_id(),
            outcome,
            remote_execution_start: start,
            remote_execution_end: SystemTime::now(),
            execution_id: self.executions.fetch_add(1, AtomicOrdering::Relaxed) + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::call::{FunctionCall, encode};
    use crate::host::function::FunctionFn;

    fn host() -> ExecutionHost {
        let module = Module::new("./fixtures")
            .with_function(FunctionFn::arc("add", |args: Args| async move {
                let a: i64 = args.get(0)?;
                let b: i64 = args.get(1)?;
                anyhow::Ok(json!(a + b))
            }))
            .with_function(FunctionFn::arc("fail", |_args: Args| async move {
                Err::<serde_json::Value, _>(anyhow::anyhow!("boom").context("fail called"))
            }))
            .with_function(FunctionFn::arc("explode", |_args: Args| async move {
                if true {
                    panic!("kaboom");
                }
                anyhow::Ok(json!(null))
            }));
        ExecutionHost::new(module)
    }

    fn call(name: &str, args: Vec<i64>) -> CanonicalCall {
        encode(&FunctionCall::new(name).with_args(args), None).unwrap()
    }

    #[tokio::test]
    async fn returns_value_with_timestamps() {
        let host = host();
        let c = call("add", vec![2, 3]);
        let start = SystemTime::now();
        let res = host.execute(&c, start).await.unwrap();
        assert_eq!(res.value(), Some(&json!(5)));
        assert_eq!(res.call_id, c.call_id());
        assert_eq!(res.remote_execution_start, start);
        assert!(res.remote_execution_end >= start);
        assert_eq!(host.executions(), 1);
    }

    #[tokio::test]
    async fn target_error_becomes_error_response() {
        let host = host();
        let c = call("fail", vec![]);
        let start = SystemTime::now();
        let err = host.execute(&c, start).await.unwrap_err();
        assert_eq!(err.as_label(), "host_target_error");

        let res = host.create_error_response(err, &c, start);
        let details = res.error().unwrap();
        assert_eq!(details.message, "fail called");
        assert_eq!(details.chain, vec!["fail called", "boom"]);
        assert_eq!(res.remote_execution_start, start);
    }

    #[tokio::test]
    async fn unknown_function_is_not_found() {
        let err = host().execute(&call("missing", vec![]), SystemTime::now()).await.unwrap_err();
        assert!(matches!(err, HostError::NotFound { ref name } if name == "missing"));
        assert!(err.to_string().contains("\"missing\" not found"));
    }

    #[tokio::test]
    async fn panic_in_target_is_caught() {
        let err = host().execute(&call("explode", vec![]), SystemTime::now()).await.unwrap_err();
        assert!(matches!(err, HostError::Panicked { ref message } if message == "kaboom"));
    }

    #[tokio::test]
    async fn bad_argument_is_a_target_error() {
        let c = encode(&FunctionCall::new("add").arg("two").arg(3), None).unwrap();
        let err = host().execute(&c, SystemTime::now()).await.unwrap_err();
        assert!(err.to_string().contains("invalid argument 0"));
    }
}
