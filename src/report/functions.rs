//! The impls and functions
//!
use std::{fs, path::{Path, PathBuf}, time::Duration};
use chrono::{Local, TimeZone};
use colored::Colorize;
use itertools::Itertools;
use regex::{Captures, Regex};
use log::*;
use anyhow::{bail, Context, Result};
use crate::aggregate::MetricsData;
use crate::prometheus::QueryOutcome;
use crate::remote::FetchMode;
use crate::topology::TopologySpec;
use crate::report::{ReportConfig, ReportContext};

pub const DEFAULT_STEP: u64 = 30;
pub const DEFAULT_KUBE_CONTEXT: &str = "minikube";
pub const DEFAULT_NAMESPACE: &str = "yugabyte-test";
pub const DEFAULT_RELEASE_NAME: &str = "yb-bench";
pub const DEFAULT_PROMETHEUS_URL: &str = "http://yb-bench-prometheus:9090";
pub const DEFAULT_PODS: [&str; 3] = ["yb-tserver.*", "yb-master.*", "sysbench.*"];
pub const DEFAULT_TITLE: &str = "Sysbench Stress Test Report";
pub const DEFAULT_OUTPUT_DIR: &str = "reports";
pub const DEFAULT_TEMPLATE: &str = "templates/report_template.html";
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 30;
/// The name of the report file inside the timestamped output directory.
pub const REPORT_FILE: &str = "report.html";
/// What is shown for a value that could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            start_time: 0.0,
            end_time: 0.0,
            step: DEFAULT_STEP,
            kube_context: DEFAULT_KUBE_CONTEXT.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            prometheus_url: DEFAULT_PROMETHEUS_URL.to_string(),
            pods: DEFAULT_PODS.iter().map(|pod| pod.to_string()).collect(),
            rate_metrics: Vec::new(),
            total_metrics: Vec::new(),
            title: DEFAULT_TITLE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            fetch_mode: FetchMode::Kubectl,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        }
    }
}

impl ReportConfig {
    pub fn duration_seconds(&self) -> f64 {
        self.end_time - self.start_time
    }
    /// Reject a configuration that cannot produce a meaningful report.
    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            bail!("start and end must be unix timestamps");
        }
        if self.end_time < self.start_time {
            bail!("end ({}) is before start ({})", self.end_time, self.start_time);
        }
        if self.step == 0 {
            bail!("step must be larger than 0");
        }
        if self.pods.is_empty() {
            bail!("at least one pod pattern is needed");
        }
        Ok(())
    }
}

/// Format a number with a K/M/B suffix and two decimals, followed by `suffix`.
///
/// `999.0` gives `999.00`, `1500.0` gives `1.50K`, `2_500_000.0` gives `2.50M`.
pub fn format_number(
    value: f64,
    suffix: &str,
) -> String
{
    if value >= 1_000_000_000.0 {
        format!("{:.2}B{}", value / 1_000_000_000.0, suffix)
    } else if value >= 1_000_000.0 {
        format!("{:.2}M{}", value / 1_000_000.0, suffix)
    } else if value >= 1_000.0 {
        format!("{:.2}K{}", value / 1_000.0, suffix)
    } else {
        format!("{:.2}{}", value, suffix)
    }
}

/// Escape text for html. Braces are escaped too, so text in the page can never
/// look like the `metricsData = {...};` block.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Unix epoch seconds as local time `%Y-%m-%d %H:%M:%S`.
pub fn format_timestamp(epoch_seconds: f64) -> String {
    let seconds = epoch_seconds.floor();
    let nanoseconds = ((epoch_seconds - seconds) * 1e9) as u32;
    match Local.timestamp_opt(seconds as i64, nanoseconds).single() {
        Some(timestamp) => timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch_seconds.to_string(),
    }
}

/// The metrics as json, safe to put inside a `<script>` element.
///
/// `<` and `;` can only be part of a json string, where they are replaced by their unicode escapes:
/// the script element cannot be closed early, and the first `};` is the end of the object.
pub fn embedded_metrics_json(metrics: &MetricsData) -> Result<String> {
    let json = serde_json::to_string(metrics)
        .with_context(|| "Unable to serialize the metrics data")?;
    Ok(json.replace('<', "\\u003c").replace(';', "\\u003b"))
}

fn or_not_available(field: &Option<String>) -> String {
    escape_html(field.as_deref().unwrap_or(NOT_AVAILABLE))
}

fn cluster_spec_table(topology: &TopologySpec) -> String {
    let mut table = String::from("<table class=\"spec\">\n<tr><th>Component</th><th>Replicas</th><th>CPU request</th><th>Memory request</th><th>CPU limit</th><th>Memory limit</th></tr>\n");
    for (component, role) in [("yb-master", &topology.master), ("yb-tserver", &topology.tserver)] {
        table.push_str(&format!("<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            component,
            role.replicas.map_or(NOT_AVAILABLE.to_string(), |replicas| replicas.to_string()),
            or_not_available(&role.cpu_request),
            or_not_available(&role.mem_request),
            or_not_available(&role.cpu_limit),
            or_not_available(&role.mem_limit),
        ));
    }
    table.push_str("</table>\n<table class=\"spec\">\n");
    table.push_str(&format!("<tr><th>YugabyteDB version</th><td>{}</td></tr>\n", or_not_available(&topology.yugabyte_version)));
    table.push_str(&format!("<tr><th>Storage class</th><td>{}</td></tr>\n", or_not_available(&topology.storage.storage_class)));
    table.push_str(&format!("<tr><th>Storage size</th><td>{}</td></tr>\n", or_not_available(&topology.storage.size)));
    table.push_str("</table>");
    table
}

fn summary_table(metrics: &MetricsData) -> String {
    let mut table = String::from("<table class=\"summary\">\n<tr><th>Metric</th><th>Min</th><th>Avg</th><th>Max</th><th>Total</th><th>Data</th></tr>\n");
    for (key, result) in metrics.iter() {
        let outcome = match result.outcome {
            QueryOutcome::Data => "ok",
            QueryOutcome::Empty => "no data",
            QueryOutcome::Failed => "query failed",
        };
        table.push_str(&format!("<tr id=\"summary-{}\"><td title=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"outcome-{}\">{}</td></tr>\n",
            escape_html(key),
            escape_html(&result.query),
            escape_html(&result.name),
            format_number(result.min, ""),
            format_number(result.avg, ""),
            format_number(result.max, ""),
            format_number(result.total, ""),
            result.outcome.as_str(),
            outcome,
        ));
    }
    table.push_str("</table>");
    table
}

impl ReportContext {
    pub fn new(
        config: &ReportConfig,
        metrics: &MetricsData,
        topology: &TopologySpec,
    ) -> Result<Self>
    {
        Ok(ReportContext {
            title: escape_html(&config.title),
            start_time: format_timestamp(config.start_time),
            end_time: format_timestamp(config.end_time),
            duration: format!("{:.1} minutes", config.duration_seconds() / 60.0),
            pods: config.pods.iter().map(|pod| format!("<code>{}</code>", escape_html(pod))).join(", "),
            cluster_spec: cluster_spec_table(topology),
            summary_table: summary_table(metrics),
            metrics_json: embedded_metrics_json(metrics)?,
        })
    }
    fn value(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "title" => Some(&self.title),
            "start_time" => Some(&self.start_time),
            "end_time" => Some(&self.end_time),
            "duration" => Some(&self.duration),
            "pods" => Some(&self.pods),
            "cluster_spec" => Some(&self.cluster_spec),
            "summary_table" => Some(&self.summary_table),
            "metrics_json" => Some(&self.metrics_json),
            _ => None,
        }
    }
    /// Replace every `{{ placeholder }}` in the template.
    /// A placeholder without a value means template and program do not belong together, and is an error.
    pub fn render(
        &self,
        template: &str,
    ) -> Result<String>
    {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}")?;
        let unknown: Vec<&str> = placeholder.captures_iter(template)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str())
            .filter(|name| self.value(name).is_none())
            .unique()
            .collect();
        if !unknown.is_empty() {
            bail!("Template contains unknown placeholders: {}", unknown.join(", "));
        }
        Ok(placeholder
            .replace_all(template, |captures: &Captures| self.value(&captures[1]).unwrap_or_default().to_string())
            .into_owned())
    }
}

/// Render the report document.
pub fn render(
    config: &ReportConfig,
    metrics: &MetricsData,
    topology: &TopologySpec,
    template: &str,
) -> Result<String>
{
    ReportContext::new(config, metrics, topology)?.render(template)
}

/// Read the template. A missing template is a packaging error, and fatal.
pub fn load_template(path: &Path) -> Result<String> {
    if !path.is_file() {
        bail!("Template not found: {}", path.display());
    }
    fs::read_to_string(path)
        .with_context(|| format!("Error reading template: {}", path.display()))
}

/// Write the report to `<output_dir>/<YYYYMMDD_HHMM>/report.html`, and return the path of the file.
pub fn save_report(
    output_dir: &Path,
    html: &str,
) -> Result<PathBuf>
{
    let report_directory = output_dir.join(Local::now().format("%Y%m%d_%H%M").to_string());
    fs::create_dir_all(&report_directory)
        .with_context(|| format!("Cannot create directory: {}", report_directory.display()))?;
    let report_file = report_directory.join(REPORT_FILE);
    fs::write(&report_file, html)
        .with_context(|| format!("Cannot write file: {}", report_file.display()))?;
    info!("report written: {} bytes", html.len());
    println!("Report saved to: {}", report_file.display().to_string().green());
    Ok(report_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateResult, SeriesData};
    use crate::topology::RoleSpec;

    #[test]
    fn unit_format_number() {
        assert_eq!(format_number(999.0, ""), "999.00");
        assert_eq!(format_number(1500.0, ""), "1.50K");
        assert_eq!(format_number(2_500_000.0, ""), "2.50M");
        assert_eq!(format_number(3_200_000_000.0, ""), "3.20B");
        assert_eq!(format_number(0.0, ""), "0.00");
        assert_eq!(format_number(1000.0, " B/s"), "1.00K B/s");
        assert_eq!(format_number(12.345, "%"), "12.35%");
    }

    #[test]
    fn unit_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_html("metricsData = {};"), "metricsData = &#123;&#125;;");
    }

    #[test]
    fn unit_render_title_cannot_replace_metrics_data() {
        let config = ReportConfig { title: "run metricsData = {};".to_string(), ..Default::default() };
        let mut metrics = MetricsData::new();
        metrics.insert("cpu", AggregateResult {
            name: "CPU Usage (%)".to_string(),
            outcome: QueryOutcome::Data,
            series: vec![SeriesData { name: "yb-tserver-0".to_string(), timestamps: vec![1.0, 2.0], values: vec![10.0, 30.0] }],
            ..Default::default()
        });
        metrics.insert(&crate::aggregate::metric_key("rate", "x{a=\"b\"}"), AggregateResult {
            name: "Rate: metricsData = {\"fake\":{}};".to_string(),
            ..Default::default()
        });
        let template = include_str!("../../templates/report_template.html");
        let html = render(&config, &metrics, &TopologySpec::default(), template).unwrap();

        let embedded = crate::parser::parse_embedded_metrics(&html).unwrap();
        assert!(embedded.contains_key("cpu"));
        assert_eq!(embedded.len(), 2);
        let summary = crate::parser::summarize_tserver_metrics(&embedded);
        assert_eq!(summary.tservers, 1);
        assert_eq!(summary.cpu_percent, Some(20.0));
    }

    #[test]
    fn unit_validate() {
        let config = ReportConfig { start_time: 100.0, end_time: 400.0, ..Default::default() };
        assert!(config.validate().is_ok());
        assert_eq!(config.duration_seconds(), 300.0);
        assert!(ReportConfig { start_time: 400.0, end_time: 100.0, ..Default::default() }.validate().is_err());
        assert!(ReportConfig { start_time: 100.0, end_time: 100.0, ..Default::default() }.validate().is_ok());
        assert!(ReportConfig { step: 0, ..Default::default() }.validate().is_err());
        assert!(ReportConfig { pods: Vec::new(), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn unit_embedded_metrics_json_cannot_end_early() {
        let mut metrics = MetricsData::new();
        metrics.insert("rate_x", AggregateResult {
            name: "Rate: x{a=\"};</script>\"}".to_string(),
            series: vec![SeriesData { name: "yb-tserver-0".to_string(), timestamps: vec![1.0], values: vec![2.5] }],
            ..Default::default()
        });
        let json = embedded_metrics_json(&metrics).unwrap();
        assert!(!json.contains("};\""));
        assert!(!json.contains("</script>"));
        assert!(json.ends_with('}'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rate_x"]["name"], "Rate: x{a=\"};</script>\"}");
    }

    #[test]
    fn unit_render_replaces_placeholders() {
        let config = ReportConfig { start_time: 1_705_823_400.0, end_time: 1_705_824_000.0, title: "Run <1>".to_string(), ..Default::default() };
        let mut metrics = MetricsData::new();
        metrics.insert("cpu", AggregateResult { name: "CPU Usage (%)".to_string(), avg: 1500.0, outcome: QueryOutcome::Data, ..Default::default() });
        let topology = TopologySpec {
            tserver: RoleSpec { replicas: Some(3), ..Default::default() },
            ..Default::default()
        };
        let template = "<h1>{{ title }}</h1><p>{{duration}}</p>{{ cluster_spec }}{{ summary_table }}<script>const metricsData = {{ metrics_json }};</script>";
        let html = render(&config, &metrics, &topology, template).unwrap();
        assert!(html.starts_with("<h1>Run &lt;1&gt;</h1><p>10.0 minutes</p>"));
        assert!(html.contains("<td>yb-tserver</td><td>3</td><td>N/A</td>"));
        assert!(html.contains("<td>1.50K</td>"));
        assert!(html.contains("class=\"outcome-data\">ok</td>"));
        assert!(html.contains("const metricsData = {\"cpu\":{\"name\":\"CPU Usage (%)\""));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn unit_render_unknown_placeholder() {
        let result = render(&ReportConfig::default(), &MetricsData::new(), &TopologySpec::default(), "{{ title }} {{ chart_colors }}");
        assert!(result.unwrap_err().to_string().contains("chart_colors"));
    }

    #[test]
    fn unit_load_template_missing() {
        let result = load_template(Path::new("/nonexistent/report_template.html"));
        assert!(result.unwrap_err().to_string().starts_with("Template not found"));
    }

    #[test]
    fn unit_bundled_template_renders() {
        let template = include_str!("../../templates/report_template.html");
        let html = render(&ReportConfig::default(), &MetricsData::new(), &TopologySpec::default(), template).unwrap();
        assert!(html.contains("const metricsData = {};"));
    }

    #[test]
    fn unit_save_report() {
        let directory = tempfile::tempdir().unwrap();
        let report_file = save_report(directory.path(), "<html></html>").unwrap();
        assert_eq!(report_file.file_name().unwrap(), REPORT_FILE);
        let timestamp_directory = report_file.parent().unwrap().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(timestamp_directory.len(), "YYYYMMDD_HHMM".len());
        assert_eq!(fs::read_to_string(report_file).unwrap(), "<html></html>");
    }
}
