use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use crate::dataset::Dataset;
use super::rules::{DatasetType, PropertyRule, Schema, ValueType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl SchemaReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validates a dataset against a [`Schema`], accumulating every violation.
///
/// For an `array` schema the required fields and property rules apply to each
/// record, with errors prefixed by `record[i]`. For an `object` schema (or no
/// declared type with a single record) they apply to the record itself. A
/// declared type that disagrees with the dataset's original shape is reported
/// before any per-record error.
pub struct SchemaValidator {
    patterns: HashMap<String, std::result::Result<Regex, String>>,
}

impl SchemaValidator {
    pub fn validate(dataset: &Dataset, schema: Option<&Schema>) -> SchemaReport {
        let Some(schema) = schema else {
            return SchemaReport::from_errors(Vec::new());
        };

        let mut validator = SchemaValidator {
            patterns: HashMap::new(),
        };
        let mut errors = Vec::new();

        match schema.dataset_type {
            Some(DatasetType::Array) if dataset.is_single() => {
                let found = dataset.get(0).map(ValueType::of).unwrap_or("null");
                errors.push(format!("expected type array, found {}", found));
            }
            Some(DatasetType::Object) if !dataset.is_single() => {
                errors.push(format!(
                    "expected type object, found array of {} records",
                    dataset.len()
                ));
            }
            _ => {}
        }

        validator.check_patterns(schema, &mut errors);

        let untyped_single = schema.dataset_type.is_none() && dataset.len() == 1;
        for (i, record) in dataset.iter().enumerate() {
            let index = match schema.dataset_type {
                Some(DatasetType::Object) if dataset.is_single() => None,
                None if untyped_single => None,
                _ => Some(i),
            };
            validator.check_record(index, record, schema, &mut errors);
        }

        SchemaReport::from_errors(errors)
    }

    /// Validates a raw value, checking the declared top-level type before coercion.
    pub fn validate_value(value: &Value, schema: Option<&Schema>) -> SchemaReport {
        Self::validate(&Dataset::from_value(value.clone()), schema)
    }

    fn check_patterns(&mut self, schema: &Schema, errors: &mut Vec<String>) {
        for (field, rule) in &schema.properties {
            let Some(ref pattern) = rule.pattern else {
                continue;
            };
            let compiled = Regex::new(pattern).map_err(|e| e.to_string());
            if let Err(ref e) = compiled {
                errors.push(format!("property '{}': invalid pattern '{}': {}", field, pattern, e));
            }
            self.patterns.insert(pattern.clone(), compiled);
        }
    }

    fn check_record(
        &self,
        index: Option<usize>,
        record: &Value,
        schema: &Schema,
        errors: &mut Vec<String>,
    ) {
        let location = match index {
            Some(i) => format!("record[{}]", i),
            None => "record".to_string(),
        };

        let Some(fields) = record.as_object() else {
            errors.push(format!("{}: expected object, found {}", location, ValueType::of(record)));
            return;
        };

        for field in &schema.required {
            if !fields.contains_key(field) {
                errors.push(format!("{}: missing required field '{}'", location, field));
            }
        }

        self.check_properties(&location, fields, schema, errors);
    }

    fn check_properties(
        &self,
        location: &str,
        fields: &Map<String, Value>,
        schema: &Schema,
        errors: &mut Vec<String>,
    ) {
        for (field, rule) in &schema.properties {
            if let Some(value) = fields.get(field) {
                self.check_property(location, field, value, rule, errors);
            }
        }
    }

    fn check_property(
        &self,
        location: &str,
        field: &str,
        value: &Value,
        rule: &PropertyRule,
        errors: &mut Vec<String>,
    ) {
        if let Some(expected) = rule.value_type {
            if !expected.matches(value) {
                errors.push(format!(
                    "{}: field '{}' expected type {}, found {}",
                    location,
                    field,
                    expected.as_str(),
                    ValueType::of(value)
                ));
            }
        }

        if let Value::String(s) = value {
            if let Some(Ok(regex)) = rule.pattern.as_ref().and_then(|p| self.patterns.get(p)) {
                if !regex.is_match(s) {
                    errors.push(format!(
                        "{}: field '{}' does not match pattern '{}'",
                        location,
                        field,
                        regex.as_str()
                    ));
                }
            }

            let length = s.chars().count();
            if let Some(min) = rule.min_length {
                if length < min {
                    errors.push(format!(
                        "{}: field '{}' length {} < min_length {}",
                        location, field, length, min
                    ));
                }
            }
            if let Some(max) = rule.max_length {
                if length > max {
                    errors.push(format!(
                        "{}: field '{}' length {} > max_length {}",
                        location, field, length, max
                    ));
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = rule.minimum {
                if n < min {
                    errors.push(format!("{}: field '{}' value {} < minimum {}", location, field, n, min));
                }
            }
            if let Some(max) = rule.maximum {
                if n > max {
                    errors.push(format!("{}: field '{}' value {} > maximum {}", location, field, n, max));
                }
            }
        }
    }
}
