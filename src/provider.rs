//! # Backend contract shared by execution providers.
//!
//! A [`Backend`] takes a [`Module`] of functions and runs [`FunctionCall`]s against
//! it. Remote providers package the module, ship it and invoke it over a network;
//! the [`ImmediateBackend`](crate::ImmediateBackend) runs it in-process.
//!
//! ```text
//! initialize(module, options) ──► Ready ──► call_function(call)* ──► stop() ──► cleanup()
//!                                   └─────► set_concurrency(n)
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::call::FunctionCall;
use crate::config::Options;
use crate::core::PendingCall;
use crate::error::CallError;
use crate::host::Module;

/// Log sink a host may install on a backend.
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Packaged code produced by backends that deploy remotely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackResult {
    /// Archive bytes.
    pub archive: Vec<u8>,
    /// Path of the entry point inside the archive.
    pub index_path: String,
}

/// Operations every execution backend provides.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short provider name.
    fn name(&self) -> &'static str;

    /// Loads `module` and transitions to Ready.
    async fn initialize(&self, module: Module, options: Options) -> Result<(), CallError>;

    /// Packages a module for deployment.
    async fn pack(&self, module_specifier: &str, options: &Options)
    -> Result<PackResult, CallError>;

    /// Removes leftover cloud resources described by `resources`.
    async fn cleanup_resources(&self, resources: &str) -> Result<(), CallError>;

    /// Schedules a call. Resolves to the result envelope once it completes.
    fn call_function(&self, call: &FunctionCall) -> Result<PendingCall, CallError>;

    /// Changes the number of calls allowed to execute at once (`0` = unlimited).
    async fn set_concurrency(&self, max_concurrency: usize) -> Result<(), CallError>;

    /// Stops accepting work and waits for in-flight calls. Returns a provider-specific
    /// identifier for the stopped deployment.
    async fn stop(&self) -> Result<String, CallError>;

    /// Stops and releases everything acquired by `initialize`.
    async fn cleanup(&self) -> Result<(), CallError>;

    /// Installs or removes a log sink.
    fn set_logger(&self, logger: Option<Logger>);
}
