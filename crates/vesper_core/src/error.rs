use std::time::Duration;
use thiserror::Error;

/// Domain failures that callers may want to tell apart.
///
/// Most functions return `anyhow::Result`; these variants travel inside it
/// and can be recovered with `downcast_ref::<VesperError>()`.
#[derive(Debug, Error)]
pub enum VesperError {
    #[error("{service} unavailable: {reason}")]
    CollaboratorUnavailable { service: String, reason: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("unrecognized tone label: {0:?}")]
    ClassificationAmbiguous(String),

    #[error("output channel unresolved")]
    ChannelUnresolved,

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    #[error("invalid schedule '{rule}': {reason}")]
    InvalidSchedule { rule: String, reason: String },
}

impl VesperError {
    pub fn unavailable(service: &str, reason: impl ToString) -> Self {
        Self::CollaboratorUnavailable {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            after,
        }
    }
}
