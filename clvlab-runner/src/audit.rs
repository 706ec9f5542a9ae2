//! Ingest audit record and persistence sinks.
//!
//! One record per ingest run: `timestamp_utc`, a summary block
//! (`total_books`, `successful`, `dq_pass`), and one detail entry per source
//! with its terminal fetch outcome. The record is composed after the merge
//! barrier and written even when the run subsequently fails a gate, so failed
//! runs leave a complete trail.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clvlab_core::FetchResult;

/// Terminal status tag for a source, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Ok,
    Fail,
}

/// Per-source data-quality tag in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceDqStatus {
    Pass,
    LowRowcount,
    FailedFetch,
}

/// One detail entry per configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAudit {
    pub book: String,
    pub status: AuditStatus,
    pub rows: usize,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dq_status: SourceDqStatus,
}

/// Summary counts over all configured sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_books: usize,
    pub successful: usize,
    /// Sources that fetched OK with at least the configured row floor.
    pub dq_pass: usize,
}

/// Audit record for one ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp_utc: DateTime<Utc>,
    pub summary: AuditSummary,
    pub details: Vec<SourceAudit>,
}

impl AuditRecord {
    /// Compose a record from terminal fetch results and the per-source row
    /// floor.
    pub fn from_results(results: &[FetchResult], min_rows_per_source: usize) -> Self {
        let details: Vec<SourceAudit> = results
            .iter()
            .map(|r| {
                let dq_status = if !r.is_ok() {
                    SourceDqStatus::FailedFetch
                } else if r.row_count() < min_rows_per_source {
                    SourceDqStatus::LowRowcount
                } else {
                    SourceDqStatus::Pass
                };
                SourceAudit {
                    book: r.source.clone(),
                    status: if r.is_ok() {
                        AuditStatus::Ok
                    } else {
                        AuditStatus::Fail
                    },
                    rows: r.row_count(),
                    attempts: r.attempts,
                    error: r.error().map(str::to_string),
                    dq_status,
                }
            })
            .collect();

        let summary = AuditSummary {
            total_books: details.len(),
            successful: details
                .iter()
                .filter(|d| d.status == AuditStatus::Ok)
                .count(),
            dq_pass: details
                .iter()
                .filter(|d| d.dq_status == SourceDqStatus::Pass)
                .count(),
        };

        Self {
            timestamp_utc: Utc::now(),
            summary,
            details,
        }
    }
}

/// Errors from audit persistence.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit record to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence seam for audit records.
pub trait AuditSink: Send + Sync {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Pretty-JSON file sink. Creates parent directories on first write.
pub struct JsonFileAuditSink {
    path: PathBuf,
}

impl JsonFileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonFileAuditSink {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string_pretty(record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AuditError::Io {
                path: self.path.display().to_string(),
                source: e,
            })?;
        }
        fs::write(&self.path, json).map_err(|e| AuditError::Io {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit sink poisoned").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .expect("audit sink poisoned")
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clvlab_core::{FeedPayload, FetchStatus};

    fn ok_result(source: &str, rows: usize, attempts: u32) -> FetchResult {
        let payload = FeedPayload {
            rows: (0..rows).map(|_| serde_json::Map::new()).collect(),
        };
        FetchResult {
            source: source.into(),
            status: FetchStatus::Ok { payload },
            attempts,
            fetched_at: Utc::now(),
        }
    }

    fn fail_result(source: &str, error: &str, attempts: u32) -> FetchResult {
        FetchResult {
            source: source.into(),
            status: FetchStatus::Fail {
                error: error.into(),
            },
            attempts,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            ok_result("pinnacle", 120, 1),
            ok_result("sbo", 30, 2),
            fail_result("isn", "HTTP 502 from 'isn'", 5),
        ];
        let record = AuditRecord::from_results(&results, 50);
        assert_eq!(record.summary.total_books, 3);
        assert_eq!(record.summary.successful, 2);
        assert_eq!(record.summary.dq_pass, 1);
        assert_eq!(record.details[1].dq_status, SourceDqStatus::LowRowcount);
        assert_eq!(record.details[2].dq_status, SourceDqStatus::FailedFetch);
        assert_eq!(record.details[2].error.as_deref(), Some("HTTP 502 from 'isn'"));
    }

    #[test]
    fn serialized_record_uses_contract_keys() {
        let record = AuditRecord::from_results(&[ok_result("pinnacle", 80, 1)], 50);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("timestamp_utc").is_some());
        assert_eq!(value["summary"]["total_books"], 1);
        assert_eq!(value["summary"]["successful"], 1);
        assert_eq!(value["summary"]["dq_pass"], 1);
        assert_eq!(value["details"][0]["book"], "pinnacle");
        assert_eq!(value["details"][0]["status"], "OK");
        // No error key for successful sources.
        assert!(value["details"][0].get("error").is_none());
    }

    #[test]
    fn file_sink_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("ingest_audit.json");
        let sink = JsonFileAuditSink::new(&path);
        let record = AuditRecord::from_results(&[fail_result("sbo", "timeout", 3)], 50);
        sink.write(&record).unwrap();
        let read: AuditRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, record);
    }
}
