use chrono::{DateTime, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::checksum::{merkle_root, ChecksumResult, Checksums};
use crate::dataset::Dataset;
use crate::error::{GuardError, Result};

#[derive(Debug, Clone, Default)]
pub struct GoldenMetadataInput {
    pub version: Option<String>,
    pub description: Option<String>,
}

impl GoldenMetadataInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenMetadata {
    pub version: Option<String>,
    pub description: Option<String>,
    pub checksums: ChecksumResult,
    pub merkle_root: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenDataset {
    pub id: Uuid,
    pub data: Dataset,
    pub metadata: GoldenMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldenSummary {
    pub id: Uuid,
    pub metadata: GoldenMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldenVerification {
    pub id: Uuid,
    pub intact: bool,
    pub stored_hash: String,
    pub actual_hash: String,
}

/// Immutable baseline snapshots, one JSON file per baseline.
///
/// There is no update operation: every [`GoldenStore::create`] allocates a
/// fresh id and files are opened with `create_new`.
pub struct GoldenStore {
    dir: PathBuf,
}

impl GoldenStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Opened golden store {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn create(&self, data: &Dataset, input: GoldenMetadataInput) -> Result<Uuid> {
        let golden = GoldenDataset {
            id: Uuid::new_v4(),
            data: data.clone(),
            metadata: GoldenMetadata {
                version: input.version,
                description: input.description,
                checksums: Checksums::compute_dataset(data)?,
                merkle_root: merkle_root(data.records())?,
                created_at: Utc::now(),
            },
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(&golden.id))?;
        file.write_all(serde_json::to_string_pretty(&golden)?.as_bytes())?;
        file.sync_all()?;

        info!(
            "Created golden dataset {} ({} records)",
            golden.id, golden.metadata.checksums.record_count
        );

        Ok(golden.id)
    }

    pub fn retrieve(&self, id: &Uuid) -> Result<GoldenDataset> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(GuardError::NotFound(*id));
        }

        let content = fs::read_to_string(&path)?;
        let golden: GoldenDataset = serde_json::from_str(&content)?;
        Ok(golden)
    }

    /// Metadata of every baseline, oldest first.
    pub fn list(&self) -> Result<Vec<GoldenSummary>> {
        let pattern = self.dir.join("*.json");
        let pattern_str = pattern.to_string_lossy();

        let paths: Vec<PathBuf> = glob(&pattern_str)
            .map_err(|e| GuardError::Config(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let mut summaries = Vec::new();
        for path in paths {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<GoldenDataset>(&content) {
                Ok(golden) => summaries.push(GoldenSummary {
                    id: golden.id,
                    metadata: golden.metadata,
                }),
                Err(e) => warn!("Skipping unreadable golden dataset {}: {}", path.display(), e),
            }
        }

        summaries.sort_by_key(|s| s.metadata.created_at);
        Ok(summaries)
    }

    /// Recomputes the snapshot checksum and compares it with the recorded one.
    pub fn verify(&self, id: &Uuid) -> Result<GoldenVerification> {
        let golden = self.retrieve(id)?;
        let actual = Checksums::compute_dataset(&golden.data)?;

        Ok(GoldenVerification {
            id: *id,
            intact: actual.content_hash == golden.metadata.checksums.content_hash,
            stored_hash: golden.metadata.checksums.content_hash,
            actual_hash: actual.content_hash,
        })
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}
