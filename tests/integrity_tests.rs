use driftguard::audit::{AuditLog, AuditStatus, BreakKind, NewAuditEntry, Phase};
use driftguard::checksum::{merkle_root, sha256, Checksums};
use driftguard::{reconcile, AnomalyDetector, BaselineStats, Dataset, GoldenMetadataInput, GoldenStore};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn entry_path(log: &AuditLog, sequence: u64, id: &uuid::Uuid) -> PathBuf {
    log.dir().join("entries").join(format!("{:020}-{}.json", sequence, id))
}

fn append_n(log: &AuditLog, n: usize) {
    for i in 0..n {
        let phase = if i % 2 == 0 { Phase::PreDeployment } else { Phase::PostDeployment };
        log.append(NewAuditEntry::new(phase, format!("step-{}", i), AuditStatus::Passed))
            .unwrap();
    }
}

#[test]
fn test_checksum_is_deterministic() {
    let data = json!([{"id": 1, "email": "a@b.com"}, {"id": 2, "email": "c@d.com"}]);
    let hashes: Vec<String> = (0..5)
        .map(|_| Checksums::compute(&data).unwrap().content_hash)
        .collect();
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_checksum_matches_manual_digest() {
    let data = json!([{"id": 1}]);
    let result = Checksums::compute(&data).unwrap();
    assert_eq!(result.content_hash, sha256(r#"[{"id":1}]"#));
}

#[test]
fn test_merkle_three_records_hand_computed() {
    let records: Vec<Value> = vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})];
    let leaves: Vec<String> = ["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"].iter().map(|s| sha256(s)).collect();
    let n01 = sha256(&format!("{}{}", leaves[0], leaves[1]));
    let n22 = sha256(&format!("{}{}", leaves[2], leaves[2]));
    assert_eq!(merkle_root(&records).unwrap(), sha256(&format!("{}{}", n01, n22)));
}

#[test]
fn test_chain_of_n_entries_verifies() {
    let tmp = TempDir::new().unwrap();
    let log = AuditLog::open(tmp.path()).unwrap();
    append_n(&log, 10);

    let report = log.verify_integrity();
    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(report.entries_verified, 10);
    assert!(report.errors.is_empty());
}

#[test]
fn test_corrupted_previous_hash_is_reported() {
    let tmp = TempDir::new().unwrap();
    let log = AuditLog::open(tmp.path()).unwrap();
    append_n(&log, 5);

    let target = log.entries().unwrap().into_iter().find(|e| e.sequence == 3).unwrap();
    let path = entry_path(&log, target.sequence, &target.id);
    let mut value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value["previous_hash"] = json!(sha256("forged"));
    fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    let report = log.verify_integrity();
    assert!(!report.valid);
    assert_eq!(report.entries_verified, 5);
    assert!(report
        .errors
        .iter()
        .any(|e| e.sequence == Some(3) && e.kind == BreakKind::PreviousHashMismatch));
    assert!(report
        .errors
        .iter()
        .any(|e| e.sequence == Some(3) && e.kind == BreakKind::HashMismatch));
    // entries after the break still chain to their stored predecessor
    assert!(report.errors.iter().all(|e| e.sequence == Some(3)));
}

#[test]
fn test_unreadable_entry_is_counted() {
    let tmp = TempDir::new().unwrap();
    let log = AuditLog::open(tmp.path()).unwrap();
    append_n(&log, 3);

    let target = log.entries().unwrap().remove(1);
    fs::write(entry_path(&log, target.sequence, &target.id), "not json").unwrap();

    let report = log.verify_integrity();
    assert!(!report.valid);
    assert_eq!(report.entries_verified, 3);
    assert!(report.errors.iter().any(|e| e.kind == BreakKind::Unreadable));
    assert!(log.entries().is_err());
}

#[test]
fn test_concurrent_appends_keep_chain_valid() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(AuditLog::open(tmp.path()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..10 {
                    log.append(NewAuditEntry::new(
                        Phase::PreDeployment,
                        format!("thread-{}-{}", t, i),
                        AuditStatus::Passed,
                    ))
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let report = log.verify_integrity();
    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(report.entries_verified, 40);
    assert_eq!(log.head().unwrap().sequence, 40);
}

#[test]
fn test_golden_datasets_are_never_shared() {
    let tmp = TempDir::new().unwrap();
    let store = GoldenStore::open(tmp.path()).unwrap();
    let data = Dataset::from_value(json!([{"id": 1, "nested": {"x": [1, 2, 3]}}]));

    let a = store.create(&data, GoldenMetadataInput::new()).unwrap();
    let b = store.create(&data, GoldenMetadataInput::new()).unwrap();
    assert_ne!(a, b);

    let retrieved = store.retrieve(&a).unwrap();
    assert_eq!(retrieved.data, data);
    assert_eq!(
        retrieved.metadata.checksums.content_hash,
        Checksums::compute_dataset(&data).unwrap().content_hash
    );

    let ids: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
    assert!(ids.contains(&a) && ids.contains(&b));
}

#[test]
fn test_reconcile_is_idempotent() {
    let samples = vec![
        json!([]),
        json!({"id": 1}),
        json!([{"id": 1, "tags": ["x", "y"]}, {"id": 2, "meta": {"k": null}}]),
        json!([1, "two", null]),
    ];
    for sample in samples {
        let dataset = Dataset::from_value(sample);
        let result = reconcile(&dataset, &dataset);
        assert!(result.matches);
        assert!(result.differences.is_empty());
    }
}

#[test]
fn test_anomaly_boundary_is_strict() {
    let baseline = BaselineStats { record_count: 100, average_size: None };
    let current = Dataset::new((0..105).map(|i| json!({"id": i})).collect());
    let result = AnomalyDetector::default().detect(&current, Some(&baseline)).unwrap();
    assert!(!result.detected);
}
