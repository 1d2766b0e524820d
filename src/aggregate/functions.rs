//! The impls and functions
//!
use std::time::Instant;
use itertools::Itertools;
use log::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use crate::series::{self, MetricSeries};
use crate::prometheus::{PrometheusClient, QueryOutcome};
use crate::report::ReportConfig;
use crate::aggregate::{AggregateResult, MetricQuery, MetricsData, SeriesData};

/// The statistics of a metric are taken from the pods with this in their name only.
pub const PRIMARY_ROLE: &str = "yb-tserver";
/// The range of the `rate()` function in the generated queries.
pub const RATE_RANGE: &str = "30s";

/// Query `query` over the report window, and summarize the result.
/// A failed query results in zero statistics and no series; the outcome tells which case it was.
pub fn aggregate(
    client: &PrometheusClient,
    query: &str,
    display_name: &str,
    config: &ReportConfig,
) -> AggregateResult
{
    let timer = Instant::now();
    let range_query = client.query_range_outcome(query, config.start_time, config.end_time, config.step);
    let mut result = summarize(&range_query.series, PRIMARY_ROLE, config.duration_seconds());
    result.name = display_name.to_string();
    result.query = query.to_string();
    result.outcome = range_query.outcome;
    match result.outcome {
        QueryOutcome::Failed => warn!("{}: query failed, statistics set to zero", display_name),
        QueryOutcome::Empty => info!("{}: no data", display_name),
        QueryOutcome::Data => info!("{}: {} series, avg {:.2}: {:?}", display_name, result.series.len(), result.avg, timer.elapsed()),
    }
    result
}

/// Summarize the series into min/avg/max/total.
///
/// Only the series with a pod label containing `role` count for the statistics,
/// but all series are kept for display.
pub fn summarize(
    series_list: &[MetricSeries],
    role: &str,
    duration_seconds: f64,
) -> AggregateResult
{
    let pool: Vec<f64> = series_list.iter()
        .filter(|series| series.label("pod").map_or(false, |pod| pod.contains(role)))
        .flat_map(|series| series.values().iter().copied())
        .collect();

    let min = series::positive_min(&pool);
    let avg = series::positive_avg(&pool);
    let max = series::max_of_all(&pool);

    AggregateResult {
        min,
        avg,
        max,
        total: avg * duration_seconds,
        series: series_list.iter()
            .map(|series| SeriesData {
                name: series.display_name().to_string(),
                timestamps: series.timestamps().to_vec(),
                values: series.values().to_vec(),
            })
            .collect(),
        ..Default::default()
    }
}

/// Turn a metric expression into a key that is safe as an identifier:
/// every character that is not ascii alphanumeric or an underscore becomes an underscore.
pub fn sanitize_key(expression: &str) -> String {
    expression.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn metric_key(
    prefix: &str,
    expression: &str,
) -> String
{
    format!("{}_{}", prefix, sanitize_key(expression))
}

/// The standard container metrics for the pods matching any of `pods` in `namespace`.
pub fn container_metric_queries(
    namespace: &str,
    pods: &[String],
) -> Vec<MetricQuery>
{
    let selector = format!(r#"{{namespace="{}",pod=~"{}"}}"#, namespace, pods.iter().join("|"));
    let rate_by_pod = |metric: &str| format!("sum(rate({}{}[{}])) by (pod)", metric, selector, RATE_RANGE);
    let gauge_by_pod = |metric: &str| format!("sum({}{}) by (pod)", metric, selector);

    [
        ("cpu", "CPU Usage (%)", format!("{} * 100", rate_by_pod("container_cpu_usage_seconds_total"))),
        ("memory", "Memory Usage (MB)", format!("{} / 1024 / 1024", gauge_by_pod("container_memory_working_set_bytes"))),
        ("network_rx", "Network RX (B/s)", rate_by_pod("container_network_receive_bytes_total")),
        ("network_tx", "Network TX (B/s)", rate_by_pod("container_network_transmit_bytes_total")),
        ("disk_read_iops", "Disk Read IOPS", rate_by_pod("container_fs_reads_total")),
        ("disk_write_iops", "Disk Write IOPS", rate_by_pod("container_fs_writes_total")),
        ("disk_read_throughput", "Disk Read (MB/s)", format!("{} / 1024 / 1024", rate_by_pod("container_fs_reads_bytes_total"))),
        ("disk_write_throughput", "Disk Write (MB/s)", format!("{} / 1024 / 1024", rate_by_pod("container_fs_writes_bytes_total"))),
    ]
        .into_iter()
        .map(|(key, name, query)| MetricQuery { key: key.to_string(), name: name.to_string(), query })
        .collect()
}

/// The user supplied metrics: `sum(rate(<expr>[30s]))` for the rate metrics, `sum(<expr>)` for the total metrics.
/// The expression is kept verbatim for the query and the display name.
pub fn custom_metric_queries(
    rate_metrics: &[String],
    total_metrics: &[String],
) -> Vec<MetricQuery>
{
    let rates = rate_metrics.iter()
        .map(|expression| MetricQuery {
            key: metric_key("rate", expression),
            name: format!("Rate: {}", expression),
            query: format!("sum(rate({}[{}]))", expression, RATE_RANGE),
        });
    let totals = total_metrics.iter()
        .map(|expression| MetricQuery {
            key: metric_key("total", expression),
            name: format!("Total: {}", expression),
            query: format!("sum({})", expression),
        });
    rates.chain(totals).collect()
}

impl MetricsData {
    pub fn new() -> Self {
        Default::default()
    }
    /// Add a result under `key`, and return the key it is stored under.
    /// Distinct expressions can sanitize to the same key; a later one gets a numbered suffix instead of replacing the earlier one.
    pub fn insert(
        &mut self,
        key: &str,
        result: AggregateResult,
    ) -> String
    {
        let mut unique_key = key.to_string();
        let mut suffix = 2;
        while self.get(&unique_key).is_some() {
            unique_key = format!("{}_{}", key, suffix);
            suffix += 1;
        }
        if unique_key != key {
            warn!("metric key {} already in use, storing {} as {}", key, result.name, unique_key);
        }
        self.entries.push((unique_key.clone(), result));
        unique_key
    }
    pub fn get(&self, key: &str) -> Option<&AggregateResult> {
        self.entries.iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, result)| result)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AggregateResult)> {
        self.entries.iter().map(|(key, result)| (key, result))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricsData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}
