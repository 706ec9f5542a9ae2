//! HTTP feed provider.
//!
//! Issues one GET per pull against the source endpoint and normalizes the
//! JSON body into rows. Feeds disagree on shape: some return an array of row
//! objects, others a column map of equal-length arrays. Both are accepted;
//! anything else is a malformed (non-retryable) payload.

use std::time::Duration;

use serde_json::Value;

use crate::domain::dataset::Row;
use crate::domain::Source;
use crate::fetch::provider::{FeedError, FeedPayload, FeedProvider};

/// Blocking HTTP transport for feed pulls.
pub struct HttpFeedProvider {
    client: reqwest::blocking::Client,
}

impl HttpFeedProvider {
    /// Build a provider with a per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// Normalize a JSON body into row objects.
    fn rows_from_body(source: &Source, body: Value) -> Result<Vec<Row>, FeedError> {
        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(FeedError::Malformed {
                        source: source.name.clone(),
                        reason: format!("array element is not an object: {other}"),
                    }),
                })
                .collect(),
            Value::Object(map) => columns_to_rows(source, map),
            other => Err(FeedError::Malformed {
                source: source.name.clone(),
                reason: format!("expected array or object, got {other}"),
            }),
        }
    }
}

/// Transpose a column map `{col: [v0, v1, ...]}` into row objects.
fn columns_to_rows(
    source: &Source,
    map: serde_json::Map<String, Value>,
) -> Result<Vec<Row>, FeedError> {
    let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(map.len());
    let mut len: Option<usize> = None;
    for (name, value) in map {
        let Value::Array(cells) = value else {
            return Err(FeedError::Malformed {
                source: source.name.clone(),
                reason: format!("column '{name}' is not an array"),
            });
        };
        match len {
            None => len = Some(cells.len()),
            Some(expected) if expected != cells.len() => {
                return Err(FeedError::Malformed {
                    source: source.name.clone(),
                    reason: format!(
                        "column '{name}' has {} cells, expected {expected}",
                        cells.len()
                    ),
                });
            }
            Some(_) => {}
        }
        columns.push((name, cells));
    }

    let rows = len.unwrap_or(0);
    let mut out: Vec<Row> = (0..rows).map(|_| Row::new()).collect();
    for (name, cells) in columns {
        for (row, cell) in out.iter_mut().zip(cells) {
            row.insert(name.clone(), cell);
        }
    }
    Ok(out)
}

impl FeedProvider for HttpFeedProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn pull(&self, source: &Source) -> Result<FeedPayload, FeedError> {
        let response = self.client.get(&source.endpoint).send().map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout(e.to_string())
            } else {
                FeedError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                source: source.name.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().map_err(|e| FeedError::Malformed {
            source: source.name.clone(),
            reason: format!("invalid JSON body: {e}"),
        })?;

        let rows = Self::rows_from_body(source, body)?;
        Ok(FeedPayload { rows })
    }
}
