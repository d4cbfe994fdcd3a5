mod merkle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::dataset::Dataset;
use crate::error::Result;

pub use merkle::{changed_leaves, leaf_hashes, merkle_levels, merkle_root};

pub const ALGORITHM: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumResult {
    pub content_hash: String,
    pub byte_size: usize,
    pub record_count: usize,
    pub algorithm: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumComparison {
    pub matches: bool,
    pub hash_change: bool,
    pub size_change: bool,
    pub record_count_change: bool,
    pub size_delta: i64,
    pub record_count_delta: i64,
}

pub struct Checksums;

impl Checksums {
    /// Checksums any serializable value, coercing it into a dataset first.
    pub fn compute<T: Serialize + ?Sized>(value: &T) -> Result<ChecksumResult> {
        let dataset = Dataset::from_serialize(value)?;
        Self::compute_dataset(&dataset)
    }

    pub fn compute_dataset(dataset: &Dataset) -> Result<ChecksumResult> {
        let serialized = dataset.canonical_json()?;

        Ok(ChecksumResult {
            content_hash: sha256(&serialized),
            byte_size: serialized.len(),
            record_count: dataset.len(),
            algorithm: ALGORITHM.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn compare(before: &ChecksumResult, after: &ChecksumResult) -> ChecksumComparison {
        let hash_change = before.content_hash != after.content_hash;
        let size_change = before.byte_size != after.byte_size;
        let record_count_change = before.record_count != after.record_count;

        ChecksumComparison {
            matches: !hash_change && !size_change && !record_count_change,
            hash_change,
            size_change,
            record_count_change,
            size_delta: after.byte_size as i64 - before.byte_size as i64,
            record_count_delta: after.record_count as i64 - before.record_count as i64,
        }
    }
}

pub fn sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}
