//! CLVLab Core — feed sources, retrying fetcher, DQ validation, statistics, promotion gate.
//!
//! This crate contains the leaf components of the ingest-and-promote pipeline:
//! - Domain types (sources, column-oriented datasets)
//! - Retrying feed fetcher with exponential-jitter backoff and a soft-failure contract
//! - Data-quality validator producing a single structured report
//! - Statistical summarizer (mean, median, one-sample z-test)
//! - Threshold-driven promotion gate
//! - Cooperative cancellation token shared by fetch workers

pub mod cancel;
pub mod domain;
pub mod dq;
pub mod fetch;
pub mod gate;
pub mod stats;

pub use cancel::CancelToken;
pub use domain::{Dataset, Source};
pub use dq::{run_dq_checks, DqConfig, DqReport};
pub use fetch::{
    fetch_with_retry, FeedError, FeedPayload, FeedProvider, FetchResult, FetchStatus,
    HttpFeedProvider, RetryPolicy,
};
pub use gate::{decide, PromotionDecision, ThresholdConfig};
pub use stats::{summarize, summarize_series, StatSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    /// Fetch results cross thread boundaries at the merge barrier; the token
    /// is shared by every fetch worker. Both must stay Send + Sync.
    #[test]
    fn fetch_types_are_send_sync() {
        assert_send::<FetchResult>();
        assert_sync::<FetchResult>();
        assert_send::<CancelToken>();
        assert_sync::<CancelToken>();
        assert_send::<Source>();
        assert_sync::<Source>();
        assert_send::<Dataset>();
        assert_sync::<Dataset>();
    }
}
