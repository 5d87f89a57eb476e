use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reasons a single observation is refused. A refused observation never
/// touches focus state or the event log.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObservationError {
    #[error("face count {0} is negative")]
    NegativeFaceCount(i64),

    #[error("confidence {confidence} for '{label}' is outside [0, 1]")]
    ConfidenceOutOfRange { label: String, confidence: f64 },

    #[error("observation at {observed_at} is older than the previous one at {previous}")]
    OutOfOrder {
        observed_at: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}
