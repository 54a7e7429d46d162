//! # Backend options.
//!
//! Provides [`Options`] centralized settings for an immediate backend.
//!
//! Options are captured by [`Backend::initialize`](crate::Backend::initialize)
//! and stay fixed for the lifetime of the Ready state; only the concurrency limit
//! can be changed later through `set_concurrency`.
//!
//! ## Sentinel values
//! - `concurrency = 0` → unlimited (funnel admits every call immediately)
//! - `memory_size` / `timeout` → accepted for interface compatibility with remote
//!   backends, **ignored** here (a warning is emitted for each one that is set)

use std::time::Duration;

/// Options for an immediate backend.
///
/// ## Field semantics
/// - `concurrency`: initial funnel limit (`0` = unlimited, the default)
/// - `memory_size`: remote memory size in MB (ignored)
/// - `timeout`: remote execution timeout (ignored)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `module_path`: recorded on every canonical call
#[derive(Clone, Debug)]
pub struct Options {
    /// Maximum number of calls executing at once.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = at most `n` calls run simultaneously, the rest wait FIFO
    pub concurrency: usize,

    /// Memory size requested from a remote provider, in megabytes.
    ///
    /// Not enforced in-process.
    pub memory_size: Option<u32>,

    /// Execution timeout requested from a remote provider.
    ///
    /// Not enforced in-process.
    pub timeout: Option<Duration>,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Module path attached to canonical calls (informational).
    pub module_path: Option<String>,
}

impl Options {
    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` concurrent calls
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.concurrency == 0 {
            None
        } else {
            Some(self.concurrency)
        }
    }

    /// Returns the names of options that are set but have no effect in-process.
    pub fn ignored_options(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.memory_size.is_some_and(|mb| mb > 0) {
            ignored.push("memory_size");
        }
        if self.timeout.is_some_and(|t| t > Duration::ZERO) {
            ignored.push("timeout");
        }
        ignored
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns options with the given concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Returns options with the given module path.
    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.module_path = Some(path.into());
        self
    }
}

impl Default for Options {
    /// Default options:
    ///
    /// - `concurrency = 0` (unlimited)
    /// - `memory_size = None`, `timeout = None`
    /// - `bus_capacity = 1024`
    /// - `module_path = None`
    fn default() -> Self {
        Self {
            concurrency: 0,
            memory_size: None,
            timeout: None,
            bus_capacity: 1024,
            module_path: None,
        }
    }
}
