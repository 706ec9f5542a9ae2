//! Ingest orchestrator — parallel fan-out, merge barrier, quality gates.
//!
//! One fetch worker thread per configured source; each worker runs its own
//! sequential retry loop, so a source sleeping in backoff never blocks the
//! others. Joining the workers is the merge barrier: nothing downstream sees
//! a partial result set.
//!
//! After the barrier the orchestrator always emits the audit record, then
//! gates in order: majority health (systemic upstream failure) before any
//! DQ validation, then the dataset-level DQ report. Both failures carry the
//! full finding list — ingest is all-or-nothing past the barrier even though
//! fetch itself is per-source best-effort.

use std::thread;

use thiserror::Error;

use clvlab_core::domain::dataset::Row;
use clvlab_core::dq::{run_dq_checks, DqConfig, DqReport};
use clvlab_core::fetch::{fetch_with_retry, FeedProvider, FetchResult, FetchStatus, RetryPolicy};
use clvlab_core::{CancelToken, Dataset, Source};

use crate::audit::{AuditError, AuditRecord, AuditSink};

/// Orchestrator configuration.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub retry: RetryPolicy,
    pub dq: DqConfig,
}

/// Everything a successful ingest run produced.
#[derive(Debug)]
pub struct IngestOutput {
    /// Merged dataset, rows tagged with `source` and `fetched_at`.
    pub dataset: Dataset,
    /// Terminal per-source fetch results, in configured order.
    pub results: Vec<FetchResult>,
    /// Unified DQ report (passing, possibly with advisories).
    pub report: DqReport,
    /// The audit record that was emitted for this run.
    pub audit: AuditRecord,
}

/// Run-level ingest failures.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no sources configured")]
    NoSources,

    #[error("ingest cancelled")]
    Cancelled,

    #[error("only {successful} of {total} sources fetched OK — systemic upstream failure")]
    MajorityFailed { successful: usize, total: usize },

    #[error("data quality failure: {}", issues.join(", "))]
    DataQuality { issues: Vec<String> },

    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Fetch all sources, merge, and validate.
///
/// The audit record is written after the merge barrier and before the
/// health/DQ gates, so failed runs still leave a complete trail.
pub fn ingest(
    sources: &[Source],
    provider: &dyn FeedProvider,
    config: &IngestConfig,
    cancel: &CancelToken,
    audit_sink: &dyn AuditSink,
) -> Result<IngestOutput, IngestError> {
    if sources.is_empty() {
        return Err(IngestError::NoSources);
    }

    tracing::info!(sources = sources.len(), "starting ingest");

    // Fan out: one worker per source, each with an independent retry loop.
    // Collecting the joins is the merge barrier.
    let results: Vec<FetchResult> = thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                scope.spawn(move || fetch_with_retry(provider, source, &config.retry, cancel))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("fetch worker panicked"))
            .collect()
    });

    let audit = AuditRecord::from_results(&results, config.dq.min_rows_per_source);
    audit_sink.write(&audit)?;

    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled);
    }

    let successful = results.iter().filter(|r| r.is_ok()).count();
    if successful * 2 < sources.len() {
        tracing::error!(
            successful,
            total = sources.len(),
            "majority of sources failed, aborting before DQ"
        );
        return Err(IngestError::MajorityFailed {
            successful,
            total: sources.len(),
        });
    }

    let dataset = merge_tagged(&results);
    let mut report = run_dq_checks(&dataset, &config.dq);
    report.record_volume_advisories(
        results
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| (r.source.as_str(), r.row_count())),
        config.dq.min_rows_per_source,
    );

    if !report.ok {
        tracing::error!(issues = ?report.issues, "DQ validation failed");
        return Err(IngestError::DataQuality {
            issues: report.issues,
        });
    }

    tracing::info!(
        rows = dataset.row_count(),
        successful,
        advisories = report.advisories.len(),
        "ingest complete"
    );

    Ok(IngestOutput {
        dataset,
        results,
        report,
        audit,
    })
}

/// Concatenate OK payloads, stamping each row with its source name and the
/// wall-clock fetch time.
fn merge_tagged(results: &[FetchResult]) -> Dataset {
    let mut rows: Vec<Row> = Vec::new();
    for result in results {
        let FetchStatus::Ok { payload } = &result.status else {
            continue;
        };
        for row in &payload.rows {
            let mut tagged = row.clone();
            tagged.insert("source".into(), result.source.clone().into());
            tagged.insert("fetched_at".into(), result.fetched_at.to_rfc3339().into());
            rows.push(tagged);
        }
    }
    Dataset::from_rows(rows)
}
