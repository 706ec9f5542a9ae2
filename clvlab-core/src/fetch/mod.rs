//! Feed fetching: provider trait, retry loop, HTTP implementation.

pub mod http;
pub mod provider;
pub mod retry;

pub use http::HttpFeedProvider;
pub use provider::{FeedError, FeedPayload, FeedProvider, FetchResult, FetchStatus};
pub use retry::{fetch_with_retry, RetryPolicy};
