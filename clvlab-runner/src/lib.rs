//! CLVLab Runner — ingest orchestration and pipeline collaborators.
//!
//! This crate builds on `clvlab-core` to provide:
//! - Ingest orchestrator: parallel per-source fetch, merge barrier, audit
//!   emission, majority-health rule, DQ gate
//! - Audit sink (JSON file / in-memory)
//! - Statistical summary sink (flat JSON, null for absent p-values)
//! - Downstream-selection CSV loading
//! - Pipeline and threshold configuration
//! - Webhook notifier and file-backed model registry
//! - Promotion step wiring gate → registry → notification

pub mod audit;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod promote;
pub mod registry;
pub mod selection;
pub mod summary;

pub use audit::{AuditError, AuditRecord, AuditSink, JsonFileAuditSink, MemoryAuditSink};
pub use config::{load_thresholds, ConfigError, PipelineConfig};
pub use ingest::{ingest, IngestConfig, IngestError, IngestOutput};
pub use notify::{format_promotion_message, NotifyError, Notifier};
pub use promote::{run_promotion, PromotionOutcome};
pub use registry::{FileRegistry, ModelCandidate, ModelVersion, RegistryError, Stage};
pub use selection::{load_selection, SelectionError, SelectionSeries};
pub use summary::{read_summary, summary_to_json, write_summary};
