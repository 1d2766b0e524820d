//! The impls and functions
//!
use std::{fs, io::Write, path::Path};
use regex::Regex;
use log::*;
use anyhow::{bail, Context, Result};
use crate::report::REPORT_FILE;
use crate::parser::{BenchmarkSummary, CountRate, EmbeddedMetrics, NodeSpec, TserverMetrics};

/// Tab separated pod to node mapping, written next to the report by the benchmark scripts.
pub const NODE_SPEC_FILE: &str = "RUN_NODE_SPEC.txt";
/// The saved sysbench console output.
pub const BENCHMARK_OUTPUT_FILE: &str = "sysbench_output.txt";
/// Series with this in their name are tablet servers.
const TSERVER_MARKER: &str = "tserver";

/// Parse the node spec table: a header line, followed by `pod, node, cpu, memory` tab separated rows.
///
/// Returns None when there is no data row at all. A row with fewer than four fields is skipped.
pub fn parse_node_spec(text: &str) -> Option<Vec<NodeSpec>> {
    let text = text.trim();
    if text.lines().count() < 2 {
        return None;
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut node_specs = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) if record.len() >= 4 => node_specs.push(NodeSpec {
                pod_name: record[0].to_string(),
                node_name: record[1].to_string(),
                cpu: record[2].to_string(),
                memory: record[3].to_string(),
            }),
            Ok(record) => debug!("skipping node spec row with {} fields: {:?}", record.len(), record),
            Err(e) => debug!("skipping node spec row: {}", e),
        }
    }
    Some(node_specs)
}

pub fn node_spec_lines(node_specs: &[NodeSpec]) -> Vec<String> {
    let mut lines = vec![
        "=== Tserver Node Specs ===".to_string(),
        format!("Tservers: {}", node_specs.len()),
    ];
    lines.extend(node_specs.iter()
        .map(|row| format!("  {} -> {}: {} CPU, {}", row.pod_name, row.node_name, row.cpu, row.memory)));
    lines
}

/// Find the `metricsData = {...};` json object in the report, and parse it.
/// A report without it is not a report produced by this tool, which is an error.
pub fn parse_embedded_metrics(html: &str) -> Result<EmbeddedMetrics> {
    let marker = Regex::new(r"(?s)metricsData = (\{.*?\});")?;
    let captures = match marker.captures(html) {
        Some(captures) => captures,
        None => bail!("Could not find metricsData in {}", REPORT_FILE),
    };
    serde_json::from_str(&captures[1])
        .with_context(|| format!("Could not parse metricsData in {}", REPORT_FILE))
}

/// The average of every tablet server series of metric `key`.
/// Series without values are left out.
pub fn tserver_averages(
    metrics: &EmbeddedMetrics,
    key: &str,
) -> Vec<f64>
{
    metrics.get(key)
        .map(|metric| metric.series
            .iter()
            .filter(|series| series.name.contains(TSERVER_MARKER) && !series.values.is_empty())
            .map(|series| mean(&series.values))
            .collect())
        .unwrap_or_default()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn non_empty_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() { None } else { Some(mean(values)) }
}

pub fn summarize_tserver_metrics(metrics: &EmbeddedMetrics) -> TserverMetrics {
    let cpu = tserver_averages(metrics, "cpu");
    let memory = tserver_averages(metrics, "memory");
    let network_rx = non_empty_mean(&tserver_averages(metrics, "network_rx"));
    let network_tx = non_empty_mean(&tserver_averages(metrics, "network_tx"));
    let disk_read = non_empty_mean(&tserver_averages(metrics, "disk_read_iops"));
    let disk_write = non_empty_mean(&tserver_averages(metrics, "disk_write_iops"));

    TserverMetrics {
        tservers: cpu.len(),
        cpu_percent: non_empty_mean(&cpu),
        memory_mb: non_empty_mean(&memory),
        network_mb_per_sec: network_rx.zip(network_tx).map(|(rx, tx)| (rx / 1024.0 / 1024.0, tx / 1024.0 / 1024.0)),
        disk_iops: disk_read.zip(disk_write),
    }
}

impl TserverMetrics {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "=== Tserver Metrics ===".to_string(),
            format!("Tservers: {}", self.tservers),
        ];
        if let Some(cpu) = self.cpu_percent {
            lines.push(format!("CPU: {:.1}%", cpu));
        }
        if let Some(memory) = self.memory_mb {
            lines.push(format!("Memory: {:.0} MB", memory));
        }
        if let Some((rx, tx)) = self.network_mb_per_sec {
            lines.push(format!("Network: RX {:.1} MB/s, TX {:.1} MB/s", rx, tx));
        }
        if let Some((read, write)) = self.disk_iops {
            lines.push(format!("Disk IOPS: Read {:.0}, Write {:.0}", read, write));
        }
        lines
    }
}

fn count_rate(
    text: &str,
    label: &str,
) -> Result<Option<CountRate>>
{
    let pattern = Regex::new(&format!(r"{}:\s+(\d+)\s+\(([\d.]+) per sec\.\)", regex::escape(label)))?;
    Ok(pattern.captures(text)
        .and_then(|captures| Some(CountRate {
            count: captures[1].parse().ok()?,
            per_sec: captures[2].parse().ok()?,
        })))
}

fn single_value(
    text: &str,
    pattern: &str,
) -> Result<Option<f64>>
{
    let pattern = Regex::new(pattern)?;
    Ok(pattern.captures(text).and_then(|captures| captures[1].parse().ok()))
}

/// Search the sysbench output for the result lines. Every field is searched independently.
///
/// ```text
/// SQL statistics:
///     queries performed:
///         read:                            1400000
///     transactions:                        100000 (3333.21 per sec.)
///     queries:                             2000000 (66664.20 per sec.)
///     ignored errors:                      12     (0.40 per sec.)
///     reconnects:                          0      (0.00 per sec.)
///
/// Throughput:
///     time elapsed:                        30.0011s
///
/// Latency (ms):
///          95th percentile:                        12.52
/// ```
pub fn parse_benchmark_output(text: &str) -> Result<BenchmarkSummary> {
    Ok(BenchmarkSummary {
        transactions: count_rate(text, "transactions")?,
        queries: count_rate(text, "queries")?,
        ignored_errors: count_rate(text, "ignored errors")?,
        reconnects: count_rate(text, "reconnects")?,
        latency_p95_ms: single_value(text, r"95th percentile:\s+([\d.]+)")?,
        elapsed_seconds: single_value(text, r"time elapsed:\s+([\d.]+)s")?,
    })
}

impl BenchmarkSummary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["=== Sysbench Results ===".to_string()];
        if let Some(transactions) = self.transactions {
            lines.push(format!("TPS: {:.2}", transactions.per_sec));
        }
        if let Some(queries) = self.queries {
            lines.push(format!("QPS: {:.2}", queries.per_sec));
        }
        if let Some(errors) = self.ignored_errors {
            lines.push(format!("Errors: {} ({:.2}/s)", errors.count, errors.per_sec));
        }
        if let Some(reconnects) = self.reconnects {
            lines.push(format!("Reconnects: {} ({:.2}/s)", reconnects.count, reconnects.per_sec));
        }
        if let Some(latency) = self.latency_p95_ms {
            lines.push(format!("Latency (95th): {:.2} ms", latency));
        }
        if let Some(elapsed) = self.elapsed_seconds {
            lines.push(format!("Duration: {:.1}s", elapsed));
        }
        lines
    }
}

/// Write the summary of a report directory to `out`.
///
/// The node spec file is optional. The report and the sysbench output are required.
/// Each section is written as soon as it is read, so a later failure leaves the earlier sections.
pub fn write_report_summary<W: Write>(
    report_directory: &Path,
    out: &mut W,
) -> Result<()>
{
    if !report_directory.is_dir() {
        bail!("{} is not a directory", report_directory.display());
    }

    let node_spec_file = report_directory.join(NODE_SPEC_FILE);
    if node_spec_file.is_file() {
        let text = fs::read_to_string(&node_spec_file)
            .with_context(|| format!("Error reading file: {}", node_spec_file.display()))?;
        if let Some(node_specs) = parse_node_spec(&text) {
            for line in node_spec_lines(&node_specs) {
                writeln!(out, "{}", line)?;
            }
        }
    } else {
        info!("no {} in {}", NODE_SPEC_FILE, report_directory.display());
    }

    let report_file = report_directory.join(REPORT_FILE);
    let html = fs::read_to_string(&report_file)
        .with_context(|| format!("Error reading file: {}", report_file.display()))?;
    let metrics = parse_embedded_metrics(&html)?;
    for line in summarize_tserver_metrics(&metrics).lines() {
        writeln!(out, "{}", line)?;
    }

    let benchmark_file = report_directory.join(BENCHMARK_OUTPUT_FILE);
    let output = fs::read_to_string(&benchmark_file)
        .with_context(|| format!("Error reading file: {}", benchmark_file.display()))?;
    writeln!(out)?;
    for line in parse_benchmark_output(&output)?.lines() {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
