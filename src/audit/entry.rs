use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use crate::checksum::sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    PreDeployment,
    PostDeployment,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreDeployment => "pre-deployment",
            Phase::PostDeployment => "post-deployment",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Passed,
    Failed,
}

impl AuditStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            AuditStatus::Passed
        } else {
            AuditStatus::Failed
        }
    }
}

/// Caller-supplied fields of an entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub phase: Phase,
    pub action: String,
    pub data_hash: Option<String>,
    pub status: AuditStatus,
    pub context: Map<String, Value>,
}

impl NewAuditEntry {
    pub fn new(phase: Phase, action: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            phase,
            action: action.into(),
            data_hash: None,
            status,
            context: Map::new(),
        }
    }

    pub fn with_data_hash(mut self, data_hash: impl Into<String>) -> Self {
        self.data_hash = Some(data_hash.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub action: String,
    pub data_hash: Option<String>,
    pub previous_hash: String,
    pub hash: String,
    pub status: AuditStatus,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl AuditEntry {
    pub(crate) fn seal(sequence: u64, fields: NewAuditEntry, previous_hash: String, timestamp: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let hash = entry_hash(&id, &timestamp, fields.phase, &fields.action, &previous_hash);

        Self {
            sequence,
            id,
            timestamp,
            phase: fields.phase,
            action: fields.action,
            data_hash: fields.data_hash,
            previous_hash,
            hash,
            status: fields.status,
            context: fields.context,
        }
    }

    /// Recomputes the hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        entry_hash(&self.id, &self.timestamp, self.phase, &self.action, &self.previous_hash)
    }
}

/// `H(id ‖ timestamp ‖ phase ‖ action ‖ previous_hash)`
pub fn entry_hash(
    id: &Uuid,
    timestamp: &DateTime<Utc>,
    phase: Phase,
    action: &str,
    previous_hash: &str,
) -> String {
    sha256(&format!(
        "{}{}{}{}{}",
        id,
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        phase.as_str(),
        action,
        previous_hash
    ))
}
