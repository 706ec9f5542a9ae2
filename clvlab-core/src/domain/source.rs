//! Feed source identity.

use serde::{Deserialize, Serialize};

/// An external feed, identified by a name unique within a run and the
/// endpoint it is pulled from. Immutable for the duration of an ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Book name, e.g. "pinnacle". Uniqueness is enforced at config load.
    pub name: String,
    /// Endpoint locator the fetcher issues GET requests against.
    pub endpoint: String,
}

impl Source {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}
