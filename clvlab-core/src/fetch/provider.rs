//! Feed provider trait and structured error/result types.
//!
//! The `FeedProvider` trait abstracts over feed transports (HTTP, fixtures in
//! tests) so the retry loop and the orchestrator never know where rows come
//! from. A provider performs exactly one pull per call; retries live in
//! [`crate::fetch::retry`].

use chrono::{DateTime, Utc};

use crate::domain::dataset::Row;
use crate::domain::Source;

/// Rows pulled from a single source in a single successful attempt.
#[derive(Debug, Clone, Default)]
pub struct FeedPayload {
    pub rows: Vec<Row>,
}

impl FeedPayload {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Errors from a single pull attempt.
///
/// `Display` and `Error` are implemented by hand because the `source` fields
/// hold the feed source *name* (a `String`), which `#[derive(Error)]` would
/// otherwise treat as the error's `source()` cause.
#[derive(Debug)]
pub enum FeedError {
    Network(String),
    Timeout(String),
    HttpStatus { source: String, status: u16 },
    Malformed { source: String, reason: String },
    Cancelled,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Network(detail) => write!(f, "network unreachable: {detail}"),
            FeedError::Timeout(detail) => write!(f, "request timed out: {detail}"),
            FeedError::HttpStatus { source, status } => {
                write!(f, "HTTP {status} from '{source}'")
            }
            FeedError::Malformed { source, reason } => {
                write!(f, "unexpected payload shape from '{source}': {reason}")
            }
            FeedError::Cancelled => write!(f, "fetch cancelled"),
        }
    }
}

impl std::error::Error for FeedError {}

impl FeedError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Connection problems, timeouts, and bad HTTP statuses are transient; a
    /// malformed payload will not improve on retry, and cancellation must
    /// stop the loop immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_) | FeedError::Timeout(_) | FeedError::HttpStatus { .. }
        )
    }
}

/// Trait for feed transports.
///
/// Implementations must be shareable across fetch worker threads.
pub trait FeedProvider: Send + Sync {
    /// Human-readable transport name, for log events.
    fn name(&self) -> &str;

    /// Pull the source's payload once. No retry inside.
    fn pull(&self, source: &Source) -> Result<FeedPayload, FeedError>;
}

/// Terminal outcome of a source's fetch after retries succeeded or exhausted.
#[derive(Debug, Clone)]
pub enum FetchStatus {
    /// At least one attempt succeeded; the payload is the successful pull.
    Ok { payload: FeedPayload },
    /// All attempts failed (or a terminal error occurred); carries the last
    /// error description. Never raised — callers must check the status.
    Fail { error: String },
}

/// One terminal fetch result per source.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Source name the result belongs to.
    pub source: String,
    /// Terminal status with payload or last error.
    pub status: FetchStatus,
    /// Number of attempts actually performed (1-based).
    pub attempts: u32,
    /// Wall-clock time the terminal outcome was reached.
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, FetchStatus::Ok { .. })
    }

    /// Row count of the payload, zero for failed sources.
    pub fn row_count(&self) -> usize {
        match &self.status {
            FetchStatus::Ok { payload } => payload.row_count(),
            FetchStatus::Fail { .. } => 0,
        }
    }

    /// Last error description for failed sources.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Ok { .. } => None,
            FetchStatus::Fail { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FeedError::Network("refused".into()).is_transient());
        assert!(FeedError::Timeout("10s".into()).is_transient());
        assert!(FeedError::HttpStatus {
            source: "sbo".into(),
            status: 503
        }
        .is_transient());
        assert!(!FeedError::Malformed {
            source: "sbo".into(),
            reason: "not json".into()
        }
        .is_transient());
        assert!(!FeedError::Cancelled.is_transient());
    }

    #[test]
    fn fail_result_has_zero_rows() {
        let result = FetchResult {
            source: "isn".into(),
            status: FetchStatus::Fail {
                error: "HTTP 502 from 'isn'".into(),
            },
            attempts: 5,
            fetched_at: Utc::now(),
        };
        assert!(!result.is_ok());
        assert_eq!(result.row_count(), 0);
        assert_eq!(result.error(), Some("HTTP 502 from 'isn'"));
    }
}
