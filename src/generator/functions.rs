//! The impls and functions
//!
use std::{path::PathBuf, time::Instant};
use log::*;
use anyhow::Result;
use crate::aggregate::{self, MetricQuery, MetricsData};
use crate::prometheus::PrometheusClient;
use crate::remote::{DirectHttp, FetchMode, KubectlExec, RemoteFetch};
use crate::report::{self, ReportConfig};
use crate::topology::{KubectlCli, TopologyCollector, TopologySpec};
use crate::generator::ReportGenerator;

impl ReportGenerator {
    /// Create a generator that reaches prometheus and the cluster as set in `config`.
    pub fn new(config: ReportConfig) -> Result<Self> {
        let fetcher: Box<dyn RemoteFetch> = match config.fetch_mode {
            FetchMode::Kubectl => Box::new(KubectlExec::new(&config.kube_context, &config.namespace, &config.release_name, config.fetch_timeout)),
            FetchMode::Direct => Box::new(DirectHttp::new(config.fetch_timeout)?),
        };
        let prometheus = PrometheusClient::new(fetcher, &config.prometheus_url)?;
        let topology_collector = TopologyCollector::new(Box::new(KubectlCli::new(&config.kube_context, &config.namespace, config.fetch_timeout)));
        Ok(ReportGenerator::with_parts(config, prometheus, topology_collector))
    }
    pub fn with_parts(
        config: ReportConfig,
        prometheus: PrometheusClient,
        topology_collector: TopologyCollector,
    ) -> Self
    {
        ReportGenerator { config, prometheus, topology_collector }
    }
    fn collect(
        &self,
        queries: Vec<MetricQuery>,
        metrics: &mut MetricsData,
    )
    {
        for metric_query in queries {
            let result = aggregate::aggregate(&self.prometheus, &metric_query.query, &metric_query.name, &self.config);
            metrics.insert(&metric_query.key, result);
        }
    }
    /// CPU, memory, network and disk of the configured pods.
    pub fn collect_container_metrics(&self, metrics: &mut MetricsData) {
        info!("begin container metrics");
        let timer = Instant::now();
        self.collect(aggregate::container_metric_queries(&self.config.namespace, &self.config.pods), metrics);
        info!("end container metrics: {:?}", timer.elapsed());
    }
    /// The `--rate-of` and `--total-of` metrics.
    pub fn collect_custom_metrics(&self, metrics: &mut MetricsData) {
        info!("begin custom metrics");
        let timer = Instant::now();
        self.collect(aggregate::custom_metric_queries(&self.config.rate_metrics, &self.config.total_metrics), metrics);
        info!("end custom metrics: {:?}", timer.elapsed());
    }
    /// Collect everything, and render it with the template.
    ///
    /// The template is read before any collection is done, so a packaging error does not wait for the queries.
    /// Query failures do not fail the report.
    pub fn generate_report(&self) -> Result<String> {
        let template = report::load_template(&self.config.template)?;

        let topology: TopologySpec = self.topology_collector.collect();

        let mut metrics = MetricsData::new();
        println!("Collecting container metrics...");
        self.collect_container_metrics(&mut metrics);
        println!("Collecting custom metrics...");
        self.collect_custom_metrics(&mut metrics);

        report::render(&self.config, &metrics, &topology, &template)
    }
    pub fn save_report(&self, html: &str) -> Result<PathBuf> {
        report::save_report(&self.config.output_dir, html)
    }
}
