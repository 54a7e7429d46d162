//! Error types used by the immediate backend and its execution host.
//!
//! This module defines two error enums:
//!
//! - [`CallError`] — errors surfaced to callers of the backend (encoding, lifecycle, unsupported operations).
//! - [`HostError`] — reasons an [`ExecutionHost`](crate::ExecutionHost) could not produce a return value.
//!
//! Target function failures are **not** `CallError`s: the host turns them into
//! [`Outcome::Error`](crate::Outcome::Error) data carried inside the result envelope.
//! Both types provide `as_label` / `as_message` helpers for logging and metrics.

use thiserror::Error;

/// # Errors returned by the backend surface.
///
/// Only malformed requests, misuse of the lifecycle, and executor-level faults
/// produce a `CallError`. A target function that fails still yields `Ok(envelope)`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CallError {
    /// An argument cannot be represented in the canonical call form.
    #[error("unsupported argument {index} for '{function}': {reason}")]
    UnsupportedArgument {
        /// Name of the function being called.
        function: String,
        /// Zero-based position of the offending argument.
        index: usize,
        /// What made the argument unrepresentable.
        reason: String,
    },

    /// The operation is meaningless for this backend.
    #[error("{operation} is not supported by the {backend} backend")]
    UnsupportedOperation {
        /// Operation name (e.g. `pack`).
        operation: &'static str,
        /// Backend name.
        backend: &'static str,
    },

    /// The call was discarded before it started (pending work cleared by `stop`).
    #[error("call cancelled before it started")]
    Cancelled,

    /// Operation invoked in a lifecycle state that does not allow it.
    #[error("cannot {operation} while backend is {state}")]
    InvalidState {
        /// Attempted operation.
        operation: &'static str,
        /// Current backend state.
        state: &'static str,
    },

    /// The scheduled closure panicked outside of the target function.
    #[error("executor task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Canonical JSON could not be produced or parsed.
    #[error("encoding failed: {source}")]
    Encoding {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

impl CallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use immediate::CallError;
    ///
    /// let err = CallError::UnsupportedOperation { operation: "pack", backend: "immediate" };
    /// assert_eq!(err.as_label(), "call_unsupported_operation");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::UnsupportedArgument { .. } => "call_unsupported_argument",
            CallError::UnsupportedOperation { .. } => "call_unsupported_operation",
            CallError::Cancelled => "call_cancelled",
            CallError::InvalidState { .. } => "call_invalid_state",
            CallError::Panicked { .. } => "call_panicked",
            CallError::Encoding { .. } => "call_encoding",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CallError::UnsupportedArgument {
                function,
                index,
                reason,
            } => format!("unsupported: {function} arg#{index} ({reason})"),
            CallError::UnsupportedOperation { operation, backend } => {
                format!("unsupported operation: {operation} on {backend}")
            }
            CallError::Cancelled => "cancelled before start".to_string(),
            CallError::InvalidState { operation, state } => {
                format!("invalid state: {operation} while {state}")
            }
            CallError::Panicked { message } => format!("panic: {message}"),
            CallError::Encoding { source } => format!("encoding: {source}"),
        }
    }

    /// Indicates whether the error was raised before the call reached the funnel.
    ///
    /// Returns `true` for argument and encoding failures; such calls never ran.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            CallError::UnsupportedArgument { .. } | CallError::Encoding { .. }
        )
    }
}

/// # Errors raised while executing a canonical call.
///
/// These never escape the backend: the lifecycle controller passes them to
/// [`ExecutionHost::create_error_response`](crate::ExecutionHost::create_error_response).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// The module does not export a function with this name.
    #[error("function named \"{name}\" not found")]
    NotFound {
        /// Requested function name.
        name: String,
    },

    /// The target function returned an error.
    #[error(transparent)]
    Target(#[from] anyhow::Error),

    /// The target function panicked.
    #[error("function panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use immediate::HostError;
    ///
    /// let err = HostError::NotFound { name: "missing".into() };
    /// assert_eq!(err.as_label(), "host_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::NotFound { .. } => "host_not_found",
            HostError::Target(_) => "host_target_error",
            HostError::Panicked { .. } => "host_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HostError::NotFound { name } => format!("not found: {name}"),
            HostError::Target(e) => format!("error: {e}"),
            HostError::Panicked { message } => format!("panic: {message}"),
        }
    }

    /// Renders the error and its source chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        match self {
            HostError::Target(e) => e.chain().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Renders a panic payload caught by `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_argument_mentions_unsupported() {
        let err = CallError::UnsupportedArgument {
            function: "identity".into(),
            index: 0,
            reason: "non-finite number NaN".into(),
        };
        assert!(err.to_string().contains("unsupported"));
        assert!(err.as_message().contains("unsupported"));
        assert!(err.is_rejected_request());
    }

    #[test]
    fn cancelled_is_not_a_rejected_request() {
        assert!(!CallError::Cancelled.is_rejected_request());
        assert_eq!(CallError::Cancelled.as_label(), "call_cancelled");
    }

    #[test]
    fn host_error_chain_includes_sources() {
        let err = HostError::from(anyhow::anyhow!("disk full").context("write failed"));
        assert_eq!(err.chain(), vec!["write failed", "disk full"]);
        assert_eq!(err.to_string(), "write failed");
    }

    #[test]
    fn panic_message_handles_payload_kinds() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
