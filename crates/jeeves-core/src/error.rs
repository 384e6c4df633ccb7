use thiserror::Error;

/// Failure to map a stored or user-supplied string onto one of the core enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown task type: {0}")]
    TaskType(String),

    #[error("unknown execution outcome: {0} (expected success, partial or failed)")]
    Outcome(String),

    #[error("unknown execution source: {0} (expected plan or dev_task)")]
    Source(String),

    #[error("unknown severity: {0}")]
    Severity(String),

    #[error("unknown signal kind: {0}")]
    SignalKind(String),

    #[error("unknown recommendation status: {0} (expected pending, resolved or dismissed)")]
    RecommendationStatus(String),
}
