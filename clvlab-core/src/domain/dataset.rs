//! Column-oriented dataset built from per-source JSON payloads.
//!
//! Payload rows are heterogeneous JSON objects passed through from the feed
//! endpoints unmodified aside from source/time tagging, so cells are kept as
//! raw `serde_json::Value`s. Columns are the union of keys across all rows;
//! cells absent from a row are JSON null.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row as received from a feed (or after tagging).
pub type Row = serde_json::Map<String, Value>;

/// In-memory dataset: column name → ordered cells, all columns equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: BTreeMap<String, Vec<Value>>,
    rows: usize,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dataset from row objects. Columns are the union of row keys;
    /// missing cells become null.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut count = 0;
        for row in rows {
            for (key, value) in row {
                let col = columns
                    .entry(key)
                    .or_insert_with(|| vec![Value::Null; count]);
                col.push(value);
            }
            count += 1;
            // Backfill columns the row did not mention.
            for col in columns.values_mut() {
                if col.len() < count {
                    col.push(Value::Null);
                }
            }
        }
        Self {
            columns,
            rows: count,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Numeric view of a column: non-numeric and null cells become NaN.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        self.columns
            .get(name)
            .map(|col| col.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
    }

    /// Maximum of a column with missing/non-numeric cells treated as zero.
    ///
    /// Returns `None` only when the column itself is absent. An empty column
    /// yields zero, matching the "no positive value observed" reading.
    pub fn max_treating_missing_as_zero(&self, name: &str) -> Option<f64> {
        let col = self.columns.get(name)?;
        Some(
            col.iter()
                .map(|v| v.as_f64().filter(|x| x.is_finite()).unwrap_or(0.0))
                .fold(0.0_f64, f64::max),
        )
    }
}
