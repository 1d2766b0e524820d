//! The structs
//!
use crate::prometheus::PrometheusClient;
use crate::report::ReportConfig;
use crate::topology::TopologyCollector;

/// Generates a report for a single [ReportConfig].
/// All data collected is owned by this run.
pub struct ReportGenerator {
    pub config: ReportConfig,
    pub(crate) prometheus: PrometheusClient,
    pub(crate) topology_collector: TopologyCollector,
}
