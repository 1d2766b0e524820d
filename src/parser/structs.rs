//! The structs
//!
use std::collections::BTreeMap;
use crate::aggregate::SeriesData;

/// A row of `RUN_NODE_SPEC.txt`: which node a tablet server pod runs on, and the node resources.
///
/// ```text
/// POD	NODE	CPU	MEMORY
/// yb-tserver-0	ip-10-0-1-12	8	32Gi
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub pod_name: String,
    pub node_name: String,
    pub cpu: String,
    pub memory: String,
}

/// A metric as embedded in `report.html`. Only the series are needed here.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetric {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub series: Vec<SeriesData>,
}

/// All metrics embedded in `report.html`, by metric key.
pub type EmbeddedMetrics = BTreeMap<String, EmbeddedMetric>;

/// Tablet server averages taken from the embedded metrics.
/// Each field is the average over the tablet servers of the per tablet server average.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TserverMetrics {
    pub tservers: usize,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    /// receive and transmit, in MB/s.
    pub network_mb_per_sec: Option<(f64, f64)>,
    /// read and write IOPS.
    pub disk_iops: Option<(f64, f64)>,
}

/// A count together with its per second rate, as sysbench prints it: `transactions: 1000 (33.33 per sec.)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CountRate {
    pub count: u64,
    pub per_sec: f64,
}

/// The results from the sysbench console output. A field is None when it was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSummary {
    pub transactions: Option<CountRate>,
    pub queries: Option<CountRate>,
    pub ignored_errors: Option<CountRate>,
    pub reconnects: Option<CountRate>,
    pub latency_p95_ms: Option<f64>,
    pub elapsed_seconds: Option<f64>,
}
