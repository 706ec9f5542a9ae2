//! Promotion step — wire the gate to the registry and the notifier.
//!
//! The gate decides, the registry transitions, the notifier reports. A
//! webhook failure after a successful transition is logged and swallowed:
//! the registry is the system of record, the notification is advisory.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use clvlab_core::{decide, PromotionDecision, StatSummary, ThresholdConfig};

use crate::notify::{format_promotion_message, Notifier};
use crate::registry::{FileRegistry, ModelCandidate, ModelVersion};

/// What the promotion step did.
#[derive(Debug)]
pub struct PromotionOutcome {
    pub decision: PromotionDecision,
    /// The newly registered Production version when promoted.
    pub version: Option<ModelVersion>,
}

/// Decide, transition on promote, and notify either way.
pub fn run_promotion(
    summaries: &BTreeMap<String, StatSummary>,
    primary_metric: &str,
    thresholds: &ThresholdConfig,
    registry: &FileRegistry,
    notifier: &Notifier,
) -> Result<PromotionOutcome> {
    let decision = decide(summaries, primary_metric, thresholds);

    let version = if decision.promote {
        let candidate = ModelCandidate {
            model_name: registry.model_name().to_string(),
            metrics: metric_bundle(summaries, primary_metric),
        };
        let version = registry
            .transition(&candidate)
            .context("registry transition failed")?;
        Some(version)
    } else {
        tracing::info!(reasons = ?decision.reasons, "promotion held");
        None
    };

    let message = format_promotion_message(
        registry.model_name(),
        primary_metric,
        summaries,
        &decision,
    );
    if let Err(e) = notifier.post(&message) {
        tracing::warn!(error = %e, "notification failed, continuing");
    }

    Ok(PromotionOutcome { decision, version })
}

/// Flatten summaries into the candidate's metric bundle.
///
/// Undefined means are omitted rather than written as placeholder numbers.
fn metric_bundle(
    summaries: &BTreeMap<String, StatSummary>,
    primary_metric: &str,
) -> BTreeMap<String, f64> {
    let mut bundle = BTreeMap::new();
    if let Some(primary) = summaries.get(primary_metric) {
        bundle.insert("n".to_string(), primary.sample_count as f64);
    }
    for (metric, summary) in summaries {
        if summary.mean.is_finite() {
            bundle.insert(format!("{metric}_mean"), summary.mean);
        }
        if let Some(p) = summary.p_value {
            bundle.insert(format!("p_value_{metric}"), p);
        }
    }
    bundle
}
