use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::anomaly::{AnomalyDetector, DEFAULT_THRESHOLD};
use crate::error::{GuardError, Result};
use crate::pipeline::{PostDeployConfig, PreDeployConfig, DEFAULT_ID_FIELD};
use crate::schema::Schema;

pub const DATA_DIR_ENV: &str = "DRIFTGUARD_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$DRIFTGUARD_DATA_DIR`, falling back to the platform data directory.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    pub fn golden_dir(&self) -> PathBuf {
        self.root.join("golden")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::data_local_dir()
            .map(|d| d.join("driftguard"))
            .unwrap_or_else(|| PathBuf::from(".driftguard"));
        Self { root }
    }
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Declarative pipeline settings, typically loaded from a YAML file.
///
/// Custom tests are code and are attached to the derived configs by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub create_golden: bool,
    #[serde(default)]
    pub golden_version: Option<String>,
    #[serde(default)]
    pub golden_description: Option<String>,
    #[serde(default = "default_threshold")]
    pub anomaly_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            schema: None,
            required_fields: Vec::new(),
            id_field: default_id_field(),
            create_golden: false,
            golden_version: None,
            golden_description: None,
            anomaly_threshold: default_threshold(),
        }
    }
}

impl PipelineSettings {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let settings: PipelineSettings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_field.trim().is_empty() {
            return Err(GuardError::Config("id_field must not be empty".to_string()));
        }
        AnomalyDetector::try_new(self.anomaly_threshold)?;
        Ok(())
    }

    /// Explicit `storage_dir` wins over the environment.
    pub fn storage(&self) -> StorageConfig {
        match self.storage_dir {
            Some(ref dir) => StorageConfig::new(dir.clone()),
            None => StorageConfig::from_env(),
        }
    }

    pub fn pre_deploy_config(&self) -> PreDeployConfig {
        PreDeployConfig {
            schema: self.schema.clone(),
            required_fields: self.required_fields.clone(),
            id_field: self.id_field.clone(),
            create_golden: self.create_golden,
            golden_version: self.golden_version.clone(),
            golden_description: self.golden_description.clone(),
            ..PreDeployConfig::default()
        }
    }

    pub fn post_deploy_config(&self) -> PostDeployConfig {
        PostDeployConfig {
            schema: self.schema.clone(),
            anomaly_threshold: self.anomaly_threshold,
            ..PostDeployConfig::default()
        }
    }
}
