//! Downstream-selection input — CSV of selected bets.
//!
//! Selection itself is an external step; this module only reads its output
//! file and extracts the tracked metric series. Tracked metrics whose column
//! is absent are skipped rather than failing, matching the optional-PnL
//! behaviour of the summary artifact. Unparsable cells become NaN and are
//! dropped later by the summarizer.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Per-metric series extracted from the selection file, plus the file's
/// total row count (which becomes `sample_count` downstream).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSeries {
    pub series: BTreeMap<String, Vec<f64>>,
    pub total_rows: usize,
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("failed to read selection file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selection file {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Load the tracked metric columns from a selection CSV.
pub fn load_selection(path: &Path, metrics: &[String]) -> Result<SelectionSeries, SelectionError> {
    let file = std::fs::File::open(path).map_err(|source| SelectionError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| SelectionError::Csv {
            path: path.display().to_string(),
            source: e,
        })?
        .clone();

    // Column index per tracked metric that is actually present.
    let tracked: Vec<(String, usize)> = metrics
        .iter()
        .filter_map(|metric| {
            headers
                .iter()
                .position(|h| h == metric)
                .map(|idx| (metric.clone(), idx))
        })
        .collect();

    let mut series: BTreeMap<String, Vec<f64>> =
        tracked.iter().map(|(m, _)| (m.clone(), Vec::new())).collect();
    let mut total_rows = 0;

    for record in reader.records() {
        let record = record.map_err(|e| SelectionError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        total_rows += 1;
        for (metric, idx) in &tracked {
            let value = record
                .get(*idx)
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN);
            series.get_mut(metric).expect("tracked metric present").push(value);
        }
    }

    Ok(SelectionSeries { series, total_rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy_selected.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    fn metrics() -> Vec<String> {
        vec!["clv_pp".to_string(), "pnl".to_string()]
    }

    #[test]
    fn extracts_tracked_columns() {
        let (_dir, path) = write_csv("clv_pp,pnl,market\n0.02,0.5,EPL\n0.01,-0.2,NBA\n");
        let selection = load_selection(&path, &metrics()).unwrap();
        assert_eq!(selection.total_rows, 2);
        assert_eq!(selection.series["clv_pp"], vec![0.02, 0.01]);
        assert_eq!(selection.series["pnl"], vec![0.5, -0.2]);
    }

    #[test]
    fn absent_metric_column_skipped() {
        let (_dir, path) = write_csv("clv_pp\n0.02\n");
        let selection = load_selection(&path, &metrics()).unwrap();
        assert!(selection.series.contains_key("clv_pp"));
        assert!(!selection.series.contains_key("pnl"));
    }

    #[test]
    fn unparsable_cells_become_nan() {
        let (_dir, path) = write_csv("clv_pp,pnl\n0.02,oops\n,0.3\n");
        let selection = load_selection(&path, &metrics()).unwrap();
        assert_eq!(selection.total_rows, 2);
        assert!(selection.series["pnl"][0].is_nan());
        assert!(selection.series["clv_pp"][1].is_nan());
        assert_eq!(selection.series["pnl"][1], 0.3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_selection(Path::new("/nonexistent/sel.csv"), &metrics()).unwrap_err();
        assert!(matches!(err, SelectionError::Io { .. }));
    }
}
