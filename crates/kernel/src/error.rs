//! Query error types.

use std::fmt;

use thiserror::Error;

/// Boxed collaborator error passed through unmodified.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which execution the collaborator was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fetching the rows of the requested page.
    PageFetch,
    /// Counting the full filtered set.
    CountFetch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PageFetch => write!(f, "page fetch"),
            Phase::CountFetch => write!(f, "count fetch"),
        }
    }
}

/// Errors raised while translating or executing a grid request.
///
/// Every variant except `Execution` is a client-input error: the request is
/// rejected as a whole and nothing is returned.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("malformed filter node at {path}: {reason}")]
    MalformedFilterNode { path: String, reason: String },

    #[error("invalid filter operator: {0}")]
    UnknownOperator(String),

    #[error("operator {operator} does not accept a {kind} value")]
    UnsupportedValue {
        operator: &'static str,
        kind: &'static str,
    },

    #[error("invalid {bound}: {reason}")]
    InvalidPageBound {
        bound: &'static str,
        reason: String,
    },

    #[error("{phase} failed: {source}")]
    Execution {
        phase: Phase,
        #[source]
        source: BoxError,
    },
}

impl QueryError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        QueryError::MalformedFilterNode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn execution<E>(phase: Phase, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        QueryError::Execution {
            phase,
            source: Box::new(source),
        }
    }

    /// True for translation failures caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueryError::Execution { .. })
    }
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;
