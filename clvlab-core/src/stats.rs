//! Statistical summarizer — descriptive stats and a one-sample z-test.
//!
//! Implements from first principles:
//! - Abramowitz–Stegun rational approximation for erf
//! - Standard normal CDF
//! - Two-sided one-sample z-test (H0: true mean = 0)
//!
//! A degenerate sample (fewer than two values, or zero variance) carries no
//! significance claim: its p-value is absent, not zero and not an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── Math primitives ─────────────────────────────────────────────────

/// Error function via Abramowitz & Stegun 7.1.26 (|error| <= 1.5e-7).
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Sample standard deviation with Bessel's correction. NaN for n < 2.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1) as f64).sqrt()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

// ─── Summary ─────────────────────────────────────────────────────────

/// Descriptive statistics plus significance for one metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Total row count of the originating dataset — not the cleaned-series
    /// length, so dropped rows stay visible.
    pub sample_count: usize,
    pub mean: f64,
    pub median: f64,
    /// Two-sided p-value against a zero true mean. Absent for degenerate
    /// samples (cleaned n < 2 or zero standard deviation).
    pub p_value: Option<f64>,
}

/// Summarize one metric series. Non-finite values are dropped first.
pub fn summarize_series(values: &[f64], total_row_count: usize) -> StatSummary {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let m = mean(&clean);
    let p_value = p_value_zero_mean(&clean, m);
    StatSummary {
        sample_count: total_row_count,
        mean: m,
        median: median(&clean),
        p_value,
    }
}

/// Summarize every tracked metric series against the same originating row
/// count.
pub fn summarize(
    series: &BTreeMap<String, Vec<f64>>,
    total_row_count: usize,
) -> BTreeMap<String, StatSummary> {
    series
        .iter()
        .map(|(name, values)| (name.clone(), summarize_series(values, total_row_count)))
        .collect()
}

/// Two-sided z-test p-value for H0: true mean = 0.
///
/// `z = mean / (sd / sqrt(n))`, `p = 2 * (1 - cdf(|z|))`. None when the
/// sample is degenerate.
fn p_value_zero_mean(clean: &[f64], mean: f64) -> Option<f64> {
    let n = clean.len();
    if n < 2 {
        return None;
    }
    let sd = sample_std(clean, mean);
    if sd == 0.0 {
        return None;
    }
    let z = mean / (sd / (n as f64).sqrt());
    Some(2.0 * (1.0 - normal_cdf(z.abs())))
}
