//! The structs
//!
use std::collections::BTreeMap;

/// A single time series as returned by a prometheus range query.
///
/// The identity of the series is the name plus the label set, for example:
///
/// ```text
/// name: container_cpu_usage_seconds_total
/// labels: { "pod": "yb-tserver-0", "namespace": "yugabyte-test" }
/// ```
///
/// The timestamps and values are index aligned: `timestamps[n]` is the time of `values[n]`.
/// Outside the crate the only way to create a series is [MetricSeries::new],
/// which guarantees both vectors have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSeries {
    pub(crate) name: String,
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) timestamps: Vec<f64>,
    pub(crate) values: Vec<f64>,
}
