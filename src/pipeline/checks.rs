use std::collections::HashMap;
use crate::dataset::Dataset;
use super::result::{CompletenessReport, DuplicateId, DuplicateReport, MissingField};

/// Every record must carry every required field with a non-null value.
pub fn check_completeness(dataset: &Dataset, required_fields: &[String]) -> CompletenessReport {
    let mut missing = Vec::new();

    for (index, record) in dataset.iter().enumerate() {
        for field in required_fields {
            let present = record
                .get(field)
                .map(|v| !v.is_null())
                .unwrap_or(false);
            if !present {
                missing.push(MissingField {
                    index,
                    field: field.clone(),
                });
            }
        }
    }

    CompletenessReport {
        complete: missing.is_empty(),
        missing,
    }
}

/// Groups records sharing the same `id_field` value. Records without the field are skipped.
pub fn check_duplicates(dataset: &Dataset, id_field: &str) -> DuplicateReport {
    let mut order: Vec<DuplicateId> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, record) in dataset.iter().enumerate() {
        let Some(id) = record.get(id_field) else {
            continue;
        };
        if id.is_null() {
            continue;
        }

        let key = id.to_string();
        match seen.get(&key) {
            Some(&slot) => order[slot].indices.push(index),
            None => {
                seen.insert(key, order.len());
                order.push(DuplicateId {
                    id: id.clone(),
                    indices: vec![index],
                });
            }
        }
    }

    DuplicateReport {
        id_field: id_field.to_string(),
        duplicates: order.into_iter().filter(|d| d.indices.len() > 1).collect(),
    }
}
