use serde_json::{Map, Value};
use uuid::Uuid;
use crate::anomaly::{BaselineStats, DEFAULT_THRESHOLD};
use crate::checksum::ChecksumResult;
use crate::schema::Schema;
use super::data_test::DataTest;
use super::result::ValidationResult;

pub const DEFAULT_ID_FIELD: &str = "id";

#[derive(Debug, Clone)]
pub struct PreDeployConfig {
    pub schema: Option<Schema>,
    pub required_fields: Vec<String>,
    pub id_field: String,
    pub tests: Vec<DataTest>,
    pub create_golden: bool,
    pub golden_version: Option<String>,
    pub golden_description: Option<String>,
    /// Extra metadata stored with the audit entry.
    pub context: Map<String, Value>,
}

impl Default for PreDeployConfig {
    fn default() -> Self {
        Self {
            schema: None,
            required_fields: Vec::new(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            tests: Vec::new(),
            create_golden: false,
            golden_version: None,
            golden_description: None,
            context: Map::new(),
        }
    }
}

impl PreDeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_test(mut self, test: DataTest) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_golden(mut self, description: Option<String>) -> Self {
        self.create_golden = true;
        self.golden_description = description;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PostDeployConfig {
    pub schema: Option<Schema>,
    pub pre_deployment_checksums: Option<ChecksumResult>,
    pub pre_deployment_stats: Option<BaselineStats>,
    pub golden_dataset_id: Option<Uuid>,
    pub tests: Vec<DataTest>,
    pub anomaly_threshold: f64,
    pub context: Map<String, Value>,
}

impl Default for PostDeployConfig {
    fn default() -> Self {
        Self {
            schema: None,
            pre_deployment_checksums: None,
            pre_deployment_stats: None,
            golden_dataset_id: None,
            tests: Vec::new(),
            anomaly_threshold: DEFAULT_THRESHOLD,
            context: Map::new(),
        }
    }
}

impl PostDeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carries checksums, statistics and the golden id forward from a pre-deployment run.
    pub fn from_pre_deployment(pre: &ValidationResult) -> Self {
        Self {
            pre_deployment_checksums: pre.checksums().cloned(),
            pre_deployment_stats: pre.statistics().cloned(),
            golden_dataset_id: pre.golden_id(),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_checksums(mut self, checksums: ChecksumResult) -> Self {
        self.pre_deployment_checksums = Some(checksums);
        self
    }

    pub fn with_stats(mut self, stats: BaselineStats) -> Self {
        self.pre_deployment_stats = Some(stats);
        self
    }

    pub fn with_golden_id(mut self, id: Uuid) -> Self {
        self.golden_dataset_id = Some(id);
        self
    }

    pub fn with_test(mut self, test: DataTest) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_anomaly_threshold(mut self, threshold: f64) -> Self {
        self.anomaly_threshold = threshold;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
