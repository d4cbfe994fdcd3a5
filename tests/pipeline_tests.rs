use driftguard::{
    should_rollback, CheckReport, Dataset, DataTest, GuardError, PipelineContext, PipelineSettings,
    PostDeployConfig, PreDeployConfig, PropertyRule, Schema, StorageConfig, ValidationResult, ValueType,
};
use driftguard::audit::Phase;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

fn open_context(tmp: &TempDir) -> PipelineContext {
    PipelineContext::open(&StorageConfig::new(tmp.path())).unwrap()
}

fn users() -> Dataset {
    Dataset::from_value(json!([
        {"id": 1, "email": "a@b.com"},
        {"id": 2, "email": "c@d.com"}
    ]))
}

fn user_schema() -> Schema {
    Schema::array()
        .require("id")
        .require("email")
        .property("email", PropertyRule::typed(ValueType::String).with_pattern(r"^[^@]+@[^@]+$"))
}

fn pre_config() -> PreDeployConfig {
    PreDeployConfig::new()
        .with_schema(user_schema())
        .with_required_fields(["id", "email"])
}

#[test]
fn test_pre_deploy_passes_for_valid_dataset() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);

    let result = ctx.pipeline().pre_deploy(&users(), &pre_config());

    assert!(result.passed, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.phase, Phase::PreDeployment);
    assert_eq!(result.checksums().unwrap().record_count, 2);
    assert_eq!(result.statistics().unwrap().record_count, 2);
    assert!(result.merkle_root().is_some());
    assert!(matches!(result.get("audit"), Some(CheckReport::Audit { sequence: 1, .. })));
    assert!(!should_rollback(&result));
}

#[test]
fn test_dropped_record_is_reported_by_post_deploy() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config());
    assert!(pre.passed);

    let deployed = Dataset::from_value(json!([{"id": 1, "email": "a@b.com"}]));
    let post_config = PostDeployConfig::new()
        .with_schema(user_schema())
        .with_checksums(pre.checksums().unwrap().clone());
    let post = pipeline.post_deploy(&deployed, &post_config);

    let comparison = post.checksum_comparison().unwrap();
    assert!(comparison.record_count_change);
    assert!(!comparison.matches);
    assert_eq!(comparison.record_count_delta, -1);

    assert!(post.passed, "{:?}", post.errors);
    assert!(post.has_warnings());
    assert!(!should_rollback(&post));

    let Some(CheckReport::ChangeReport(change)) = post.get("change_report") else {
        panic!("missing change report");
    };
    assert_eq!(change.previous_record_count, Some(2));
    assert_eq!(change.current_record_count, 1);
    assert_eq!(change.content_changed, Some(true));
}

#[test]
fn test_pre_deploy_accumulates_all_errors() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);

    let dataset = Dataset::from_value(json!([
        {"id": 1, "email": "a@b.com"},
        {"id": 1},
        {"id": 3, "email": null}
    ]));
    let config = pre_config().with_test(DataTest::named("at_least_five", |d| Ok(d.len() >= 5)));
    let result = ctx.pipeline().pre_deploy(&dataset, &config);

    assert!(!result.passed);
    assert!(result.errors.iter().any(|e| e.starts_with("Schema: record[1]")));
    assert!(result.errors.iter().any(|e| e.starts_with("Schema: record[2]") && e.contains("expected type string")));
    assert!(result.errors.iter().any(|e| e == "Completeness: record 1 missing required field 'email'"));
    assert!(result.errors.iter().any(|e| e == "Completeness: record 2 missing required field 'email'"));
    assert!(result.errors.iter().any(|e| e.starts_with("Duplicates: id 1")));
    assert!(result.errors.iter().any(|e| e == "Custom test 'at_least_five' failed"));

    // later checks still ran
    assert!(result.get("tests").is_some());
    assert!(result.get("audit").is_some());
    assert!(should_rollback(&result));
}

#[test]
fn test_golden_roundtrip_through_phases() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config().with_golden(Some("baseline".to_string())));
    let golden_id = pre.golden_id().expect("golden dataset created");
    assert_eq!(ctx.golden.list().unwrap().len(), 1);

    let unchanged = pipeline.post_deploy(&users(), &PostDeployConfig::from_pre_deployment(&pre));
    let Some(CheckReport::Reconciliation(reconciliation)) = unchanged.get("reconciliation") else {
        panic!("missing reconciliation");
    };
    assert!(reconciliation.matches);
    assert!(unchanged.warnings.is_empty(), "{:?}", unchanged.warnings);
    assert!(unchanged.passed);

    let modified = Dataset::from_value(json!([
        {"id": 1, "email": "changed@b.com"},
        {"id": 2, "email": "c@d.com"}
    ]));
    let post = pipeline.post_deploy(&modified, &PostDeployConfig::from_pre_deployment(&pre).with_golden_id(golden_id));
    assert!(post.passed);
    assert!(post.warnings.iter().any(|w| w.contains("record 0 differs in email")));
    assert!(!should_rollback(&post));
}

#[test]
fn test_unknown_golden_id_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);

    let missing = Uuid::new_v4();
    let post = ctx.pipeline().post_deploy(&users(), &PostDeployConfig::new().with_golden_id(missing));

    assert!(!post.passed);
    assert!(post.errors.iter().any(|e| e.contains(&missing.to_string())));
    assert!(matches!(post.get("reconciliation"), Some(CheckReport::Failed { .. })));
    // later checks still ran
    assert!(post.get("audit_integrity").is_some());

    let err = ctx.golden.retrieve(&missing).unwrap_err();
    assert!(matches!(err, GuardError::NotFound(id) if id == missing));
}

#[test]
fn test_anomalies_are_warnings() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config());
    let grown = Dataset::from_value(json!([
        {"id": 1, "email": "a@b.com"},
        {"id": 2, "email": "c@d.com"},
        {"id": 3, "email": "e@f.com"}
    ]));
    let post = pipeline.post_deploy(&grown, &PostDeployConfig::from_pre_deployment(&pre));

    let Some(CheckReport::Anomaly(anomaly)) = post.get("anomaly") else {
        panic!("missing anomaly result");
    };
    assert!(anomaly.detected);
    assert!(post.warnings.iter().any(|w| w.starts_with("Anomaly: Record count changed by 50.0%")));
    assert!(post.passed);
    assert!(!should_rollback(&post));
}

#[test]
fn test_tampered_audit_log_forces_rollback() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config());
    assert!(pre.passed);

    let entry = ctx.audit.entries().unwrap().remove(0);
    let path = ctx
        .audit
        .dir()
        .join("entries")
        .join(format!("{:020}-{}.json", entry.sequence, entry.id));
    let mut value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    value["action"] = json!("forged");
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let post = pipeline.post_deploy(&users(), &PostDeployConfig::from_pre_deployment(&pre));
    assert!(!post.passed);
    assert!(post.errors.iter().any(|e| e.starts_with("Audit integrity: entry 1")));
    assert!(should_rollback(&post));
}

#[test]
fn test_failing_custom_tests_do_not_stop_the_phase() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);

    let config = PostDeployConfig::new()
        .with_test(DataTest::anonymous(|_| Err(GuardError::test("ignored", "lookup failed"))))
        .with_test(DataTest::named("panics", |_| panic!("unexpected")))
        .with_test(DataTest::named("non_empty", |d| Ok(!d.is_empty())));
    let post = ctx.pipeline().post_deploy(&users(), &config);

    assert!(!post.passed);
    assert!(post.errors.iter().any(|e| e == "Custom test 'test_1' errored: lookup failed"));
    assert!(post.errors.iter().any(|e| e.contains("'panics'") && e.contains("unexpected")));
    let Some(CheckReport::Tests(outcomes)) = post.get("tests") else {
        panic!("missing test outcomes");
    };
    assert!(outcomes[2].passed);
    assert!(post.get("change_report").is_some());
}

#[test]
fn test_audit_records_each_phase() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config().with_context("deployment", "deploy-42"));
    let post = pipeline.post_deploy(
        &users(),
        &PostDeployConfig::from_pre_deployment(&pre).with_context("deployment", "deploy-42"),
    );
    assert!(post.passed, "{:?}", post.errors);
    ctx.flush().unwrap();

    let entries = ctx
        .audit
        .entries_where(|e| e.context.get("deployment") == Some(&json!("deploy-42")))
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].phase, Phase::PreDeployment);
    assert_eq!(entries[1].phase, Phase::PostDeployment);
    assert_eq!(entries[0].data_hash.as_deref(), Some(pre.checksums().unwrap().content_hash.as_str()));
    assert_eq!(entries[1].previous_hash, entries[0].hash);

    let report = ctx.audit.verify_integrity();
    assert!(report.valid);
    assert_eq!(report.entries_verified, 2);
}

#[test]
fn test_settings_drive_both_phases() {
    let tmp = TempDir::new().unwrap();
    let yaml = format!(
        r#"
storage_dir: {}
required_fields: [id, email]
create_golden: true
schema:
  type: array
  required: [id, email]
"#,
        tmp.path().display()
    );
    let settings = PipelineSettings::from_yaml_str(&yaml).unwrap();
    let ctx = PipelineContext::open(&settings.storage()).unwrap();

    let pre = ctx.pipeline().pre_deploy(&users(), &settings.pre_deploy_config());
    assert!(pre.passed, "{:?}", pre.errors);
    assert!(pre.golden_id().is_some());

    let mut post_config = settings.post_deploy_config();
    post_config.pre_deployment_checksums = pre.checksums().cloned();
    let post = ctx.pipeline().post_deploy(&users(), &post_config);
    assert!(post.checksum_comparison().unwrap().matches);
}

#[test]
fn test_result_serializes_to_json() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let result = ctx.pipeline().pre_deploy(&users(), &pre_config());

    let json = serde_json::to_string(&result).unwrap();
    let parsed: ValidationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.phase, Phase::PreDeployment);
    assert_eq!(parsed.validations.len(), result.validations.len());
    assert!(json.contains("\"phase\":\"pre-deployment\""));
}

#[test]
fn test_single_record_fails_array_schema() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let single = Dataset::from_value(json!({"id": 1}));
    let pre = pipeline.pre_deploy(&single, &PreDeployConfig::new().with_schema(Schema::array()));
    assert!(!pre.passed);
    assert!(pre.errors.iter().any(|e| e == "Schema: expected type array, found object"));
    assert!(should_rollback(&pre));

    let listed = Dataset::from_value(json!([{"id": 1}]));
    let post = pipeline.post_deploy(&listed, &PostDeployConfig::new().with_schema(Schema::object()));
    assert!(!post.passed);
    assert!(post.errors.iter().any(|e| e.contains("expected type object")));
}

#[test]
fn test_unusable_anomaly_threshold_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp);
    let pipeline = ctx.pipeline();

    let pre = pipeline.pre_deploy(&users(), &pre_config());
    let config = PostDeployConfig::from_pre_deployment(&pre).with_anomaly_threshold(f64::NAN);
    let post = pipeline.post_deploy(&users(), &config);

    assert!(!post.passed);
    assert!(post.errors.iter().any(|e| e.starts_with("anomaly: Configuration error")));
    assert!(matches!(post.get("anomaly"), Some(CheckReport::Failed { .. })));
}
