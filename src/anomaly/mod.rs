use serde::{Deserialize, Serialize};
use crate::dataset::{canonical_record, Dataset};
use crate::error::{GuardError, Result};

pub const DEFAULT_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub record_count: usize,
    #[serde(default)]
    pub average_size: Option<f64>,
}

impl BaselineStats {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        Ok(Self {
            record_count: dataset.len(),
            average_size: average_record_size(dataset)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub detected: bool,
    pub anomalies: Vec<String>,
    pub change_threshold: f64,
}

/// Flags relative drift of record count and average record size against a baseline.
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Rejects thresholds that would silently disable detection.
    pub fn try_new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(GuardError::Config(format!(
                "anomaly_threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        Ok(Self::new(threshold))
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, current: &Dataset, baseline: Option<&BaselineStats>) -> Result<AnomalyResult> {
        let mut anomalies = Vec::new();

        if let Some(baseline) = baseline {
            let count_change = relative_change(current.len() as f64, baseline.record_count as f64);
            if count_change > self.threshold {
                anomalies.push(format!(
                    "Record count changed by {:.1}% ({} -> {})",
                    count_change * 100.0,
                    baseline.record_count,
                    current.len()
                ));
            }

            if let Some(baseline_size) = baseline.average_size {
                let current_size = average_record_size(current)?.unwrap_or(0.0);
                let size_change = relative_change(current_size, baseline_size);
                if size_change > self.threshold {
                    anomalies.push(format!(
                        "Average record size changed by {:.1}% ({:.1} -> {:.1} bytes)",
                        size_change * 100.0,
                        baseline_size,
                        current_size
                    ));
                }
            }
        }

        Ok(AnomalyResult {
            detected: !anomalies.is_empty(),
            anomalies,
            change_threshold: self.threshold,
        })
    }
}

fn relative_change(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            1.0
        }
    } else {
        (current - baseline).abs() / baseline
    }
}

fn average_record_size(dataset: &Dataset) -> Result<Option<f64>> {
    if dataset.is_empty() {
        return Ok(None);
    }

    let mut total = 0usize;
    for record in dataset {
        total += canonical_record(record)?.len();
    }
    Ok(Some(total as f64 / dataset.len() as f64))
}
