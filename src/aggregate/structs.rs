//! The structs
//!
use crate::prometheus::QueryOutcome;

/// A single series as embedded in the report, for the charts.
/// `name` is the pod label, or the series name if there is no pod label.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SeriesData {
    pub name: String,
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

/// The summary of one metric query.
///
/// `min` and `avg` only take values above zero into account, `max` takes all values.
/// `total` is `avg` multiplied by the duration of the report window.
/// The statistics are taken from the tablet server series only, `series` holds all series.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub name: String,
    pub query: String,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub total: f64,
    pub outcome: QueryOutcome,
    pub series: Vec<SeriesData>,
}

/// A metric to query: the key it is stored under, the name to display and the PromQL expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub key: String,
    pub name: String,
    pub query: String,
}

/// All aggregated metrics of a report, in the order they were added.
/// This serializes to a json object keyed by the metric key.
#[derive(Debug, Clone, Default)]
pub struct MetricsData {
    pub(crate) entries: Vec<(String, AggregateResult)>,
}
