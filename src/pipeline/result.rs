use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::anomaly::{AnomalyResult, BaselineStats};
use crate::audit::{IntegrityReport, Phase};
use crate::checksum::{ChecksumComparison, ChecksumResult};
use crate::reconcile::ReconciliationResult;
use crate::schema::SchemaReport;
use super::data_test::TestOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingField {
    pub index: usize,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub complete: bool,
    pub missing: Vec<MissingField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateId {
    pub id: Value,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub id_field: String,
    pub duplicates: Vec<DuplicateId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub previous_record_count: Option<usize>,
    pub current_record_count: usize,
    pub record_count_delta: Option<i64>,
    pub previous_byte_size: Option<usize>,
    pub current_byte_size: usize,
    pub byte_size_delta: Option<i64>,
    pub content_changed: Option<bool>,
}

impl ChangeReport {
    pub fn new(previous: Option<&ChecksumResult>, current: &ChecksumResult) -> Self {
        Self {
            previous_record_count: previous.map(|p| p.record_count),
            current_record_count: current.record_count,
            record_count_delta: previous.map(|p| current.record_count as i64 - p.record_count as i64),
            previous_byte_size: previous.map(|p| p.byte_size),
            current_byte_size: current.byte_size,
            byte_size_delta: previous.map(|p| current.byte_size as i64 - p.byte_size as i64),
            content_changed: previous.map(|p| p.content_hash != current.content_hash),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", content = "result", rename_all = "snake_case")]
pub enum CheckReport {
    Schema(SchemaReport),
    Checksum {
        checksums: ChecksumResult,
        merkle_root: String,
    },
    ChecksumComparison(ChecksumComparison),
    Completeness(CompletenessReport),
    Duplicates(DuplicateReport),
    Statistics(BaselineStats),
    Tests(Vec<TestOutcome>),
    Golden { id: Uuid },
    Reconciliation(ReconciliationResult),
    Anomaly(AnomalyResult),
    AuditIntegrity(IntegrityReport),
    ChangeReport(ChangeReport),
    Audit { entry_id: Uuid, sequence: u64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub validations: BTreeMap<String, CheckReport>,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new(phase: Phase) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            validations: BTreeMap::new(),
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, report: CheckReport) {
        self.validations.insert(name.to_string(), report);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CheckReport> {
        self.validations.get(name)
    }

    pub fn checksums(&self) -> Option<&ChecksumResult> {
        match self.get("checksum") {
            Some(CheckReport::Checksum { checksums, .. }) => Some(checksums),
            _ => None,
        }
    }

    pub fn merkle_root(&self) -> Option<&str> {
        match self.get("checksum") {
            Some(CheckReport::Checksum { merkle_root, .. }) => Some(merkle_root),
            _ => None,
        }
    }

    pub fn checksum_comparison(&self) -> Option<&ChecksumComparison> {
        match self.get("checksum_comparison") {
            Some(CheckReport::ChecksumComparison(c)) => Some(c),
            _ => None,
        }
    }

    pub fn statistics(&self) -> Option<&BaselineStats> {
        match self.get("statistics") {
            Some(CheckReport::Statistics(s)) => Some(s),
            _ => None,
        }
    }

    pub fn golden_id(&self) -> Option<Uuid> {
        match self.get("golden") {
            Some(CheckReport::Golden { id }) => Some(*id),
            _ => None,
        }
    }

    pub fn should_rollback(&self) -> bool {
        should_rollback(self)
    }
}

/// The rollback decision: any accumulated error or a failed phase rolls back.
/// Warnings alone never do.
pub fn should_rollback(result: &ValidationResult) -> bool {
    !result.passed || !result.errors.is_empty()
}
