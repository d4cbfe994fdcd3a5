use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};
use crate::anomaly::{AnomalyDetector, BaselineStats};
use crate::audit::{AuditLog, AuditStatus, NewAuditEntry, Phase};
use crate::checksum::{merkle_root, ChecksumResult, Checksums};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::golden::{GoldenMetadataInput, GoldenStore};
use crate::reconcile::reconcile;
use crate::schema::{Schema, SchemaValidator};
use super::checks::{check_completeness, check_duplicates};
use super::config::{PostDeployConfig, PreDeployConfig};
use super::data_test::{run_tests, DataTest};
use super::result::{ChangeReport, CheckReport, ValidationResult};

const AUDIT_ACTION: &str = "validation";

/// Sequences the integrity checks of one deployment.
///
/// Holds no state of its own; the audit log and golden store are borrowed
/// from the caller. Every check runs regardless of earlier failures, and a
/// failing check is recorded instead of aborting the phase.
pub struct ValidationPipeline<'a> {
    audit: &'a AuditLog,
    golden: &'a GoldenStore,
}

impl<'a> ValidationPipeline<'a> {
    pub fn new(audit: &'a AuditLog, golden: &'a GoldenStore) -> Self {
        Self { audit, golden }
    }

    pub fn pre_deploy(&self, dataset: &Dataset, config: &PreDeployConfig) -> ValidationResult {
        let mut result = ValidationResult::new(Phase::PreDeployment);
        info!("Pre-deployment validation of {} records", dataset.len());

        self.validate_schema(&mut result, dataset, config.schema.as_ref());

        let checksums = self.compute_checksums(&mut result, dataset);

        let completeness = check_completeness(dataset, &config.required_fields);
        for missing in &completeness.missing {
            result.error(format!(
                "Completeness: record {} missing required field '{}'",
                missing.index, missing.field
            ));
        }
        result.record("completeness", CheckReport::Completeness(completeness));

        let duplicates = check_duplicates(dataset, &config.id_field);
        for duplicate in &duplicates.duplicates {
            result.error(format!(
                "Duplicates: {} {} appears at records {:?}",
                duplicates.id_field, duplicate.id, duplicate.indices
            ));
        }
        result.record("duplicates", CheckReport::Duplicates(duplicates));

        if let Some(stats) = guarded(&mut result, "statistics", || BaselineStats::from_dataset(dataset)) {
            result.record("statistics", CheckReport::Statistics(stats));
        }

        self.run_custom_tests(&mut result, dataset, &config.tests);

        if config.create_golden {
            let input = GoldenMetadataInput {
                version: config.golden_version.clone(),
                description: config.golden_description.clone(),
            };
            if let Some(id) = guarded(&mut result, "golden", || self.golden.create(dataset, input)) {
                result.record("golden", CheckReport::Golden { id });
            }
        }

        self.append_audit(&mut result, dataset, checksums.as_ref(), &config.context);

        log_outcome(&result);
        result
    }

    pub fn post_deploy(&self, dataset: &Dataset, config: &PostDeployConfig) -> ValidationResult {
        let mut result = ValidationResult::new(Phase::PostDeployment);
        info!("Post-deployment validation of {} records", dataset.len());

        self.validate_schema(&mut result, dataset, config.schema.as_ref());

        let checksums = self.compute_checksums(&mut result, dataset);

        if let (Some(before), Some(after)) = (&config.pre_deployment_checksums, &checksums) {
            let comparison = Checksums::compare(before, after);
            if !comparison.matches {
                result.warning(format!(
                    "Checksum changed since pre-deployment: records {} -> {}, bytes {} -> {}",
                    before.record_count, after.record_count, before.byte_size, after.byte_size
                ));
            }
            result.record("checksum_comparison", CheckReport::ChecksumComparison(comparison));
        }

        if let Some(id) = config.golden_dataset_id {
            let reconciliation = guarded(&mut result, "reconciliation", || {
                let golden = self.golden.retrieve(&id)?;
                Ok(reconcile(&golden.data, dataset))
            });
            if let Some(reconciliation) = reconciliation {
                if !reconciliation.matches {
                    let preview: Vec<String> = reconciliation
                        .differences
                        .iter()
                        .take(3)
                        .map(|d| d.describe())
                        .collect();
                    result.warning(format!(
                        "Golden dataset {} differs in {} places: {}",
                        id,
                        reconciliation.differences_count,
                        preview.join("; ")
                    ));
                }
                result.record("reconciliation", CheckReport::Reconciliation(reconciliation));
            }
        }

        if let Some(ref stats) = config.pre_deployment_stats {
            let anomaly = guarded(&mut result, "anomaly", || {
                AnomalyDetector::try_new(config.anomaly_threshold)?.detect(dataset, Some(stats))
            });
            if let Some(anomaly) = anomaly {
                for description in &anomaly.anomalies {
                    result.warning(format!("Anomaly: {}", description));
                }
                result.record("anomaly", CheckReport::Anomaly(anomaly));
            }
        }

        let integrity = self.audit.verify_integrity();
        for message in integrity.messages() {
            result.error(format!("Audit integrity: {}", message));
        }
        result.record("audit_integrity", CheckReport::AuditIntegrity(integrity));

        self.run_custom_tests(&mut result, dataset, &config.tests);

        if let Some(ref current) = checksums {
            let report = ChangeReport::new(config.pre_deployment_checksums.as_ref(), current);
            result.record("change_report", CheckReport::ChangeReport(report));
        }

        self.append_audit(&mut result, dataset, checksums.as_ref(), &config.context);

        log_outcome(&result);
        result
    }

    fn validate_schema(
        &self,
        result: &mut ValidationResult,
        dataset: &Dataset,
        schema: Option<&Schema>,
    ) {
        let report = SchemaValidator::validate(dataset, schema);
        for error in &report.errors {
            result.error(format!("Schema: {}", error));
        }
        result.record("schema", CheckReport::Schema(report));
    }

    fn compute_checksums(&self, result: &mut ValidationResult, dataset: &Dataset) -> Option<ChecksumResult> {
        let computed = guarded(result, "checksum", || {
            let checksums = Checksums::compute_dataset(dataset)?;
            let root = merkle_root(dataset.records())?;
            Ok((checksums, root))
        });

        computed.map(|(checksums, root)| {
            debug!("Dataset checksum {} ({} bytes)", checksums.content_hash, checksums.byte_size);
            result.record(
                "checksum",
                CheckReport::Checksum {
                    checksums: checksums.clone(),
                    merkle_root: root,
                },
            );
            checksums
        })
    }

    fn run_custom_tests(&self, result: &mut ValidationResult, dataset: &Dataset, tests: &[DataTest]) {
        if tests.is_empty() {
            return;
        }

        let outcomes = run_tests(tests, dataset);
        for outcome in &outcomes {
            match (&outcome.error, outcome.passed) {
                (Some(error), _) => result.error(error.clone()),
                (None, false) => result.error(format!("Custom test '{}' failed", outcome.name)),
                (None, true) => {}
            }
        }
        result.record("tests", CheckReport::Tests(outcomes));
    }

    fn append_audit(
        &self,
        result: &mut ValidationResult,
        dataset: &Dataset,
        checksums: Option<&ChecksumResult>,
        context: &Map<String, Value>,
    ) {
        let mut entry = NewAuditEntry::new(result.phase, AUDIT_ACTION, AuditStatus::from_passed(result.passed))
            .with_context("records", dataset.len())
            .with_context("errors", result.errors.len())
            .with_context("warnings", result.warnings.len());
        for (key, value) in context {
            entry.context.insert(key.clone(), value.clone());
        }
        if let Some(checksums) = checksums {
            entry = entry.with_data_hash(checksums.content_hash.clone());
        }

        if let Some(appended) = guarded(result, "audit", || self.audit.append(entry)) {
            result.record(
                "audit",
                CheckReport::Audit {
                    entry_id: appended.id,
                    sequence: appended.sequence,
                },
            );
        }
    }
}

/// Runs one check, recording an error or panic as a failed check instead of propagating it.
fn guarded<T, F>(result: &mut ValidationResult, name: &str, check: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    let message = match panic::catch_unwind(AssertUnwindSafe(check)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unexpected failure".to_string()),
    };

    warn!("Check '{}' failed: {}", name, message);
    result.error(format!("{}: {}", name, message));
    result.record(name, CheckReport::Failed { error: message });
    None
}

fn log_outcome(result: &ValidationResult) {
    if result.passed {
        info!(
            "{} validation passed with {} warnings",
            result.phase,
            result.warnings.len()
        );
    } else {
        warn!(
            "{} validation failed with {} errors",
            result.phase,
            result.errors.len()
        );
    }
}
