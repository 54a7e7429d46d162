//! # Execution results and the result envelope.
//!
//! - [`ExecutionResult`] — raw outcome produced by the execution host, always
//!   stamped with the host's own start/end timestamps.
//! - [`ResultEnvelope`] — what `call_function` resolves to: the raw result plus
//!   local timestamps taken around the funnel.
//!
//! ## Timestamp order
//! ```text
//! local_request_queued ≤ local_request_sent ≤ remote_response_sent ≤ local_end
//!   (before push)         (task admitted)     (host end, copied)    (after host)
//! ```
//! The host-supplied end timestamp is accepted as-is; an inconsistent host can
//! break the middle inequality and nothing corrects it.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Structured description of a failed execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Stable label of the failure kind (e.g. `host_target_error`).
    pub name: String,
    /// Outermost error message.
    pub message: String,
    /// Full error chain, outermost first.
    pub chain: Vec<String>,
}

impl From<&HostError> for ErrorDetails {
    fn from(err: &HostError) -> Self {
        Self {
            name: err.as_label().to_string(),
            message: err.to_string(),
            chain: err.chain(),
        }
    }
}

/// Either the value a function returned or the error it raised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Returned(serde_json::Value),
    Error(ErrorDetails),
}

/// Raw outcome of one execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Id of the canonical call that was executed.
    pub call_id: u64,
    /// Returned value or captured error.
    pub outcome: Outcome,
    /// Start timestamp handed to the host.
    pub remote_execution_start: SystemTime,
    /// Host's end-of-execution timestamp.
    pub remote_execution_end: SystemTime,
    /// Per-host execution counter.
    pub execution_id: u64,
}

impl ExecutionResult {
    /// True if the target failed.
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// The returned value, if any.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            Outcome::Returned(v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    /// The captured error, if any.
    pub fn error(&self) -> Option<&ErrorDetails> {
        match &self.outcome {
            Outcome::Returned(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }
}

/// Transport-level response. There is no network hop in-process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RawResponse {
    #[default]
    Empty,
}

/// Result of `call_function`: the raw execution result with local timing.
#[derive(Clone, Debug)]
pub struct ResultEnvelope {
    /// Raw execution result (success or captured failure).
    pub returned: ExecutionResult,
    /// Transport placeholder; always [`RawResponse::Empty`] here.
    pub raw_response: RawResponse,
    /// Captured before the call was pushed into the funnel.
    pub local_request_queued: SystemTime,
    /// Captured when the funnel started the call; also the host start timestamp.
    pub local_request_sent: SystemTime,
    /// Copied from [`ExecutionResult::remote_execution_end`].
    pub remote_response_sent: SystemTime,
    /// Captured after the host completed.
    pub local_end: SystemTime,
}

impl ResultEnvelope {
    /// Time from admission to completion.
    pub fn execution_time(&self) -> Duration {
        elapsed(self.local_request_sent, self.local_end)
    }

    /// Time from submission to completion, including queueing.
    pub fn round_trip(&self) -> Duration {
        elapsed(self.local_request_queued, self.local_end)
    }

    /// Time spent waiting in the funnel.
    pub fn queue_time(&self) -> Duration {
        elapsed(self.local_request_queued, self.local_request_sent)
    }

    /// True if `sent ≤ remote end ≤ local end` holds.
    pub fn is_ordered(&self) -> bool {
        self.local_request_queued <= self.local_request_sent
            && self.local_request_sent <= self.remote_response_sent
            && self.remote_response_sent <= self.local_end
    }
}

fn elapsed(from: SystemTime, to: SystemTime) -> Duration {
    to.duration_since(from).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(outcome: Outcome, start: SystemTime, end: SystemTime) -> ExecutionResult {
        ExecutionResult {
            call_id: 1,
            outcome,
            remote_execution_start: start,
            remote_execution_end: end,
            execution_id: 1,
        }
    }

    #[test]
    fn outcome_serializes_as_tagged_union() {
        let v = serde_json::to_value(Outcome::Returned(json!(3))).unwrap();
        assert_eq!(v, json!({"type": "returned", "value": 3}));

        let details = ErrorDetails::from(&HostError::NotFound { name: "nope".into() });
        let v = serde_json::to_value(Outcome::Error(details)).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["value"]["name"], "host_not_found");
    }

    #[test]
    fn envelope_durations() {
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_millis(10);
        let t2 = t0 + Duration::from_millis(40);
        let t3 = t0 + Duration::from_millis(50);
        let env = ResultEnvelope {
            returned: result(Outcome::Returned(json!(null)), t1, t2),
            raw_response: RawResponse::Empty,
            local_request_queued: t0,
            local_request_sent: t1,
            remote_response_sent: t2,
            local_end: t3,
        };
        assert!(env.is_ordered());
        assert_eq!(env.queue_time(), Duration::from_millis(10));
        assert_eq!(env.execution_time(), Duration::from_millis(40));
        assert_eq!(env.round_trip(), Duration::from_millis(50));
    }

    #[test]
    fn inconsistent_host_clock_is_detected_not_corrected() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        let env = ResultEnvelope {
            returned: result(Outcome::Returned(json!(1)), t0, SystemTime::UNIX_EPOCH),
            raw_response: RawResponse::default(),
            local_request_queued: t0,
            local_request_sent: t0,
            remote_response_sent: SystemTime::UNIX_EPOCH,
            local_end: t0,
        };
        assert!(!env.is_ordered());
        assert_eq!(env.returned.value(), Some(&json!(1)));
        assert!(env.returned.error().is_none());
    }
}
