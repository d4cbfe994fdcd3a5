use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::{GuardError, Result};

/// An ordered collection of records.
///
/// A single record is coerced into a one-element dataset, and `null` into an
/// empty one. Field order inside each record is preserved as given, so two
/// datasets that differ only in field order serialize (and hash) differently.
///
/// A coerced single record remembers its shape, so schema validation can
/// still report a top-level type mismatch and serialization gives it back
/// as a bare record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Dataset {
    records: Vec<Value>,
    single: bool,
}

impl Dataset {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records, single: false }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => Self::new(records),
            Value::Null => Self::default(),
            other => Self {
                records: vec![other],
                single: true,
            },
        }
    }

    /// Converts any serializable value into a dataset.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| GuardError::Serialization(e.to_string()))?;
        Ok(Self::from_value(value))
    }

    /// Whether this dataset was built from a single non-array value.
    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.records.get(index)
    }

    /// Compact JSON of the whole dataset, in natural field order.
    pub fn canonical_json(&self) -> Result<String> {
        serde_json::to_string(&self.records).map_err(|e| GuardError::Serialization(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.records.clone())
    }
}

impl From<Value> for Dataset {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Dataset> for Value {
    fn from(dataset: Dataset) -> Self {
        let mut records = dataset.records;
        match records.pop() {
            Some(record) if dataset.single && records.is_empty() => record,
            Some(record) => {
                records.push(record);
                Value::Array(records)
            }
            None => Value::Array(records),
        }
    }
}

impl From<Vec<Value>> for Dataset {
    fn from(records: Vec<Value>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Compact JSON of a single value, in natural field order.
pub fn canonical_record(record: &Value) -> Result<String> {
    serde_json::to_string(record).map_err(|e| GuardError::Serialization(e.to_string()))
}
