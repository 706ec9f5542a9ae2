//! Statistical summary sink — flat JSON artifact.
//!
//! Contract keys: `n`, `<metric>_mean`, `<metric>_median`,
//! `p_value_<metric>`. Absent p-values and undefined means serialize as
//! null, never as zero. The promote step reads the artifact back, so the
//! reader discovers metric names from the `*_mean` keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use clvlab_core::StatSummary;

fn finite_or_null(x: f64) -> Value {
    if x.is_finite() {
        // from_f64 only fails for non-finite input, checked above.
        Value::Number(serde_json::Number::from_f64(x).expect("finite f64"))
    } else {
        Value::Null
    }
}

/// Flatten per-metric summaries into the artifact object.
pub fn summary_to_json(summaries: &BTreeMap<String, StatSummary>) -> Value {
    let n = summaries
        .values()
        .map(|s| s.sample_count)
        .max()
        .unwrap_or(0);
    let mut obj = Map::new();
    obj.insert("n".into(), Value::from(n));
    for (metric, summary) in summaries {
        obj.insert(format!("{metric}_mean"), finite_or_null(summary.mean));
        obj.insert(format!("{metric}_median"), finite_or_null(summary.median));
        obj.insert(
            format!("p_value_{metric}"),
            summary.p_value.map_or(Value::Null, finite_or_null),
        );
    }
    Value::Object(obj)
}

/// Write the summary artifact as pretty JSON, creating parent directories.
pub fn write_summary(path: &Path, summaries: &BTreeMap<String, StatSummary>) -> Result<()> {
    let json = serde_json::to_string_pretty(&summary_to_json(summaries))
        .context("failed to serialize summary")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Read a summary artifact back into per-metric summaries.
///
/// Null means/medians become NaN (undefined), null p-values become absent —
/// the inverse of `summary_to_json`.
pub fn read_summary(path: &Path) -> Result<BTreeMap<String, StatSummary>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let obj = value
        .as_object()
        .with_context(|| format!("{} is not a JSON object", path.display()))?;
    let n = obj
        .get("n")
        .and_then(Value::as_u64)
        .with_context(|| format!("{} is missing 'n'", path.display()))? as usize;

    let mut out = BTreeMap::new();
    for key in obj.keys() {
        let Some(metric) = key.strip_suffix("_mean") else {
            continue;
        };
        let mean = obj[key].as_f64().unwrap_or(f64::NAN);
        let median = obj
            .get(&format!("{metric}_median"))
            .and_then(Value::as_f64)
            .unwrap_or(f64::NAN);
        let p_value = obj.get(&format!("p_value_{metric}")).and_then(Value::as_f64);
        out.insert(
            metric.to_string(),
            StatSummary {
                sample_count: n,
                mean,
                median,
                p_value,
            },
        );
    }
    Ok(out)
}
