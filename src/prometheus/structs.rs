//! The structs
//!
use std::collections::BTreeMap;
use url::Url;
use crate::remote::RemoteFetch;
use crate::series::MetricSeries;

/// The root struct for deserializing `/api/v1/query_range`.
///
/// ```text
/// {
///   "status": "success",
///   "data": {
///     "resultType": "matrix",
///     "result": [
///       {
///         "metric": { "pod": "yb-tserver-0" },
///         "values": [ [ 1705823400, "12.5" ], [ 1705823430, "13.1" ] ]
///       }
///     ]
///   }
/// }
/// ```
/// A failed query has `"status": "error"`, and the fields `errorType` and `error`.
#[derive(Deserialize, Debug, Default)]
pub struct QueryRangeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: QueryRangeData,
}
#[derive(Deserialize, Debug, Default)]
pub struct QueryRangeData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<QueryRangeResult>,
}
/// One series of a range query. The sample value is a string in the prometheus API.
#[derive(Deserialize, Debug, Default)]
pub struct QueryRangeResult {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

/// What happened to a query.
/// This separates a legitimately empty answer from a failure, which both result in zero statistics.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutcome {
    /// At least one series was returned.
    Data,
    /// The query succeeded, but no series matched.
    #[default]
    Empty,
    /// The fetch failed, or the response was an error or not parseable.
    Failed,
}

/// The series of a range query together with the outcome.
#[derive(Debug, Default)]
pub struct RangeQuery {
    pub outcome: QueryOutcome,
    pub series: Vec<MetricSeries>,
}

/// Client for the prometheus http API, reached through a [RemoteFetch] implementation.
pub struct PrometheusClient {
    pub(crate) fetcher: Box<dyn RemoteFetch>,
    pub(crate) query_range_endpoint: Url,
}
