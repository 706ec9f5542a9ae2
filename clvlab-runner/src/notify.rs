//! Webhook notification sink.
//!
//! The notifier is constructed from explicit configuration — no environment
//! lookups — and is a no-op when no webhook URL is configured. It only
//! formats and posts; deciding what to say stays with the promotion step.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use clvlab_core::{PromotionDecision, StatSummary};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook post failed: {0}")]
    Post(String),

    #[error("webhook rejected message: HTTP {0}")]
    Status(u16),
}

/// Posts human-readable OK/ALERT messages to a chat webhook.
pub struct Notifier {
    webhook_url: Option<String>,
    client: reqwest::blocking::Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            webhook_url,
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Post a text message. Silently does nothing when unconfigured.
    pub fn post(&self, text: &str) -> Result<(), NotifyError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };
        let response = self
            .client
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .map_err(|e| NotifyError::Post(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Render the OK/ALERT message for a promotion decision.
pub fn format_promotion_message(
    model_name: &str,
    primary_metric: &str,
    summaries: &BTreeMap<String, StatSummary>,
    decision: &PromotionDecision,
) -> String {
    let stats = summaries.get(primary_metric).map_or_else(
        || format!("{primary_metric}: no summary"),
        |s| {
            let p = s
                .p_value
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}"));
            format!(
                "{primary_metric} mean {:.4} (n={}, p={p})",
                s.mean, s.sample_count
            )
        },
    );
    if decision.promote {
        format!("OK: promoting '{model_name}' — {stats}")
    } else {
        format!(
            "ALERT: holding '{model_name}' — {stats}; reasons: {}",
            decision.reasons.join("; ")
        )
    }
}
