pub mod error;
pub mod dataset;
pub mod checksum;
pub mod schema;
pub mod audit;
pub mod golden;
pub mod anomaly;
pub mod reconcile;
pub mod pipeline;
pub mod config;

pub use error::{GuardError, Result};
pub use dataset::Dataset;
pub use checksum::{Checksums, ChecksumResult, ChecksumComparison, merkle_root, merkle_levels, changed_leaves};
pub use schema::{Schema, PropertyRule, ValueType, DatasetType, SchemaValidator, SchemaReport};
pub use audit::{AuditLog, AuditEntry, NewAuditEntry, AuditStatus, Phase, ChainHead, IntegrityReport, IntegrityBreak, BreakKind};
pub use golden::{GoldenStore, GoldenDataset, GoldenMetadata, GoldenMetadataInput, GoldenSummary, GoldenVerification};
pub use anomaly::{AnomalyDetector, AnomalyResult, BaselineStats};
pub use reconcile::{reconcile, ReconciliationResult, Difference, FieldDiff};
pub use pipeline::{
    ValidationPipeline, PipelineContext, PreDeployConfig, PostDeployConfig,
    ValidationResult, CheckReport, ChangeReport, DataTest, TestOutcome,
    should_rollback,
};
pub use config::{StorageConfig, PipelineSettings};
