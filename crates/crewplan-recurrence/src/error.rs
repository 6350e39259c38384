use thiserror::Error;

/// Errors that can occur within the recurrence engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The pattern definition is malformed. Raised at construction, never
    /// during iteration.
    #[error("Invalid pattern: {reason}")]
    InvalidPattern { reason: String },

    /// A never-ending pattern was expanded without a cap. This is a caller bug.
    #[error("Unbounded request: pattern never ends and no limit was given")]
    UnboundedRequest,

    /// The expansion produced more dates than the configured ceiling.
    #[error("Limit exceeded: expansion produced more than {limit} occurrences")]
    LimitExceeded { limit: usize },

    /// No pattern with the given ID has instances in the store.
    #[error("Pattern not found: {id}")]
    PatternNotFound { id: String },

    /// No instance with the given ID exists in the store.
    #[error("Instance not found: {id}")]
    InstanceNotFound { id: String },

    /// An external instance store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl RecurrenceError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RecurrenceError::InvalidPattern {
            reason: reason.into(),
        }
    }

    /// Short error code string for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            RecurrenceError::InvalidPattern { .. } => "INVALID_PATTERN",
            RecurrenceError::UnboundedRequest => "UNBOUNDED_REQUEST",
            RecurrenceError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            RecurrenceError::PatternNotFound { .. } => "PATTERN_NOT_FOUND",
            RecurrenceError::InstanceNotFound { .. } => "INSTANCE_NOT_FOUND",
            RecurrenceError::Store(_) => "STORE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
