use tracing::info;
use crate::audit::AuditLog;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::golden::GoldenStore;
use super::runner::ValidationPipeline;

/// Stores shared by every pipeline run against one storage root.
///
/// Lifecycle is `open` → run phases → `flush`.
pub struct PipelineContext {
    pub audit: AuditLog,
    pub golden: GoldenStore,
}

impl PipelineContext {
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        info!("Opening driftguard storage at {}", storage.root.display());
        Ok(Self {
            audit: AuditLog::open(storage.audit_dir())?,
            golden: GoldenStore::open(storage.golden_dir())?,
        })
    }

    pub fn pipeline(&self) -> ValidationPipeline<'_> {
        ValidationPipeline::new(&self.audit, &self.golden)
    }

    pub fn flush(&self) -> Result<()> {
        self.audit.flush()
    }
}
