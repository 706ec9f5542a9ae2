//! Data-quality validation — pure checks over a merged dataset.
//!
//! One report carries every defect at once: the three dataset-level rules are
//! all evaluated (no short-circuit), and per-source volume findings land in a
//! separate advisory list so a thin-but-clean book is visible without failing
//! the run. `ok` depends on `issues` only.

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;

/// Validation rules configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqConfig {
    /// Columns that must be present in the merged dataset.
    pub required_columns: Vec<String>,
    /// Column whose max (missing treated as zero) must be strictly positive.
    pub odds_column: String,
    /// Per-source row-count floor for the volume advisory.
    pub min_rows_per_source: usize,
}

impl Default for DqConfig {
    fn default() -> Self {
        Self {
            required_columns: vec![
                "exec_odds".into(),
                "clv_pp".into(),
                "market".into(),
                "ttc_minutes".into(),
            ],
            odds_column: "exec_odds".into(),
            min_rows_per_source: 50,
        }
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqReport {
    /// True iff `issues` is empty. Advisories never affect this.
    pub ok: bool,
    /// Blocking issue codes, in rule order.
    pub issues: Vec<String>,
    /// Non-blocking findings, e.g. `low_rowcount:<source>`.
    pub advisories: Vec<String>,
}

impl DqReport {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            ok: issues.is_empty(),
            issues,
            advisories: Vec::new(),
        }
    }

    /// Record `low_rowcount:<source>` for each source under the floor.
    ///
    /// Callers pass the row counts of sources that fetched OK; failed sources
    /// are already visible in the audit record and are not re-flagged here.
    pub fn record_volume_advisories<'a>(
        &mut self,
        source_rows: impl IntoIterator<Item = (&'a str, usize)>,
        floor: usize,
    ) {
        for (source, rows) in source_rows {
            if rows < floor {
                self.advisories.push(format!("low_rowcount:{source}"));
            }
        }
    }
}

/// Validate a merged dataset. Pure: no I/O, identical inputs give identical
/// reports.
///
/// Rules, all evaluated:
/// 1. non-empty dataset — `empty_frame`
/// 2. required columns present — one `missing:<column>` per absent column
/// 3. odds sanity — `bad_odds` when the odds column is present but its max
///    (missing/non-numeric as zero) is not strictly positive
pub fn run_dq_checks(dataset: &Dataset, config: &DqConfig) -> DqReport {
    let mut issues = Vec::new();

    if dataset.is_empty() {
        issues.push("empty_frame".to_string());
    }

    for column in &config.required_columns {
        if !dataset.has_column(column) {
            issues.push(format!("missing:{column}"));
        }
    }

    if let Some(max) = dataset.max_treating_missing_as_zero(&config.odds_column) {
        if max <= 0.0 {
            issues.push("bad_odds".to_string());
        }
    }

    DqReport::from_issues(issues)
}
