//! Promotion gate — pure decision over a statistical summary and thresholds.
//!
//! Three conditions must all hold: enough rows, primary-metric mean at or
//! above the floor, and the p-value under the ceiling *or absent*. An absent
//! p-value means "insufficient evidence to reject", which the gate treats as
//! non-blocking so small cohorts do not stall promotion indefinitely.
//!
//! The decision has no side effects and is re-derivable from the same two
//! inputs at any later time, which is what makes audit replay possible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::StatSummary;

/// Threshold configuration for one promotion decision. Read-only while
/// deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum originating row count.
    pub n_min: usize,
    /// Floor for the primary metric's mean.
    pub metric_mean_min: f64,
    /// Exclusive ceiling for the primary metric's p-value, in (0, 1).
    pub p_value_max: f64,
}

/// Promote/hold decision with the failing conditions named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub promote: bool,
    /// One entry per failing condition; empty when promoting.
    pub reasons: Vec<String>,
}

/// Decide promotion for the primary metric. Pure and deterministic.
///
/// Fails closed: a summary map that does not contain the primary metric, or
/// a non-finite mean, yields `promote = false` with the reason named.
pub fn decide(
    summaries: &BTreeMap<String, StatSummary>,
    primary_metric: &str,
    thresholds: &ThresholdConfig,
) -> PromotionDecision {
    let Some(summary) = summaries.get(primary_metric) else {
        return PromotionDecision {
            promote: false,
            reasons: vec![format!("missing_metric:{primary_metric}")],
        };
    };

    let mut reasons = Vec::new();

    if summary.sample_count < thresholds.n_min {
        reasons.push(format!(
            "sample_count {} < n_min {}",
            summary.sample_count, thresholds.n_min
        ));
    }

    if !summary.mean.is_finite() {
        reasons.push(format!("{primary_metric} mean is undefined"));
    } else if summary.mean < thresholds.metric_mean_min {
        reasons.push(format!(
            "{primary_metric} mean {:.6} < floor {:.6}",
            summary.mean, thresholds.metric_mean_min
        ));
    }

    match summary.p_value {
        // Absent p-value passes: degenerate samples carry no evidence
        // against promotion.
        None => {}
        Some(p) if p < thresholds.p_value_max => {}
        Some(p) => {
            reasons.push(format!(
                "p_value {:.4} >= ceiling {:.4}",
                p, thresholds.p_value_max
            ));
        }
    }

    PromotionDecision {
        promote: reasons.is_empty(),
        reasons,
    }
}
