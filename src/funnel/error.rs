use thiserror::Error;

/// Why a pushed task produced no value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunnelError {
    /// Task was discarded by `clear_pending` before it started.
    #[error("task cancelled before it started")]
    Cancelled,

    /// Task panicked while running.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl FunnelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FunnelError::Cancelled => "funnel_cancelled",
            FunnelError::Panicked { .. } => "funnel_panicked",
        }
    }
}
