use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::dataset::Dataset;

/// Field name used when records that are not objects are compared whole.
pub const WHOLE_RECORD_FIELD: &str = "$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Difference {
    RecordCountMismatch { expected: usize, actual: usize },
    MissingRecord { index: usize },
    RecordMismatch { index: usize, field_diffs: Vec<FieldDiff> },
}

impl Difference {
    pub fn describe(&self) -> String {
        match self {
            Difference::RecordCountMismatch { expected, actual } => {
                format!("record count mismatch: expected {}, found {}", expected, actual)
            }
            Difference::MissingRecord { index } => format!("record {} missing", index),
            Difference::RecordMismatch { index, field_diffs } => {
                let fields: Vec<&str> = field_diffs.iter().map(|d| d.field.as_str()).collect();
                format!("record {} differs in {}", index, fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub matches: bool,
    pub differences: Vec<Difference>,
    pub differences_count: usize,
}

/// Compares two datasets record by record, by position.
///
/// Reordered but otherwise identical datasets are reported as mismatches.
pub fn reconcile(expected: &Dataset, actual: &Dataset) -> ReconciliationResult {
    let mut differences = Vec::new();

    if expected.len() != actual.len() {
        differences.push(Difference::RecordCountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    for index in 0..expected.len().max(actual.len()) {
        match (expected.get(index), actual.get(index)) {
            (Some(e), Some(a)) => {
                let field_diffs = diff_records(e, a);
                if !field_diffs.is_empty() {
                    differences.push(Difference::RecordMismatch { index, field_diffs });
                }
            }
            _ => differences.push(Difference::MissingRecord { index }),
        }
    }

    ReconciliationResult {
        matches: differences.is_empty(),
        differences_count: differences.len(),
        differences,
    }
}

fn diff_records(expected: &Value, actual: &Value) -> Vec<FieldDiff> {
    let (Some(e), Some(a)) = (expected.as_object(), actual.as_object()) else {
        if same_serialized(Some(expected), Some(actual)) {
            return Vec::new();
        }
        return vec![FieldDiff {
            field: WHOLE_RECORD_FIELD.to_string(),
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
        }];
    };

    let keys = e.keys().chain(a.keys().filter(|k| !e.contains_key(*k)));

    keys.filter_map(|key| {
        let (ev, av) = (e.get(key), a.get(key));
        if same_serialized(ev, av) {
            None
        } else {
            Some(FieldDiff {
                field: key.clone(),
                expected: ev.cloned(),
                actual: av.cloned(),
            })
        }
    })
    .collect()
}

// Nested objects compare by their serialized form, so field order matters.
fn same_serialized(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_string() == b.to_string(),
        (None, None) => true,
        _ => false,
    }
}
