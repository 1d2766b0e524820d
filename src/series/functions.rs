//! The impls and functions
//!
use std::collections::BTreeMap;
use crate::series::MetricSeries;

impl MetricSeries {
    /// Create a series from (timestamp, value) samples.
    pub fn new(
        name: &str,
        labels: BTreeMap<String, String>,
        samples: Vec<(f64, f64)>,
    ) -> Self
    {
        let (timestamps, values) = samples.into_iter().unzip();
        MetricSeries {
            name: name.to_string(),
            labels,
            timestamps,
            values,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(|value| value.as_str())
    }
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    /// The pod label if present, otherwise the series name.
    pub fn display_name(&self) -> &str {
        self.label("pod").unwrap_or(&self.name)
    }
    /// Lowest strictly positive value, 0 if there is none.
    pub fn min_value(&self) -> f64 {
        positive_min(&self.values)
    }
    /// Highest value, zero and negative values included. 0 for an empty series.
    pub fn max_value(&self) -> f64 {
        max_of_all(&self.values)
    }
    /// Average over the strictly positive values, 0 if there are none.
    pub fn avg_value(&self) -> f64 {
        positive_avg(&self.values)
    }
    /// Estimated total: the average rate multiplied by the duration.
    pub fn total_value(&self, duration_seconds: f64) -> f64 {
        self.avg_value() * duration_seconds
    }
}

/// Lowest value above zero.
/// Idle periods of a counter or gauge show up as exactly 0, and would otherwise always be the minimum.
pub fn positive_min(values: &[f64]) -> f64 {
    values.iter()
        .copied()
        .filter(|value| *value > 0.0)
        .min_by(f64::total_cmp)
        .unwrap_or(0.0)
}

/// Average of the values above zero.
pub fn positive_avg(values: &[f64]) -> f64 {
    let (sum, count) = values.iter()
        .filter(|value| **value > 0.0)
        .fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Highest of all values, ignoring NaN.
pub fn max_of_all(values: &[f64]) -> f64 {
    values.iter()
        .copied()
        .filter(|value| !value.is_nan())
        .max_by(f64::total_cmp)
        .unwrap_or(0.0)
}
