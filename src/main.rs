use std::{collections::BTreeMap, path::{Path, PathBuf}, process, time::{Duration, Instant}};
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use log::*;
use anyhow::Result;

use yb_bench_report::generator::ReportGenerator;
use yb_bench_report::remote::FetchMode;
use yb_bench_report::report::{self, ReportConfig};
use yb_bench_report::utility;

/// Generate a stress test report for a benchmark window from prometheus metrics and the cluster topology.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Opts {
    /// Start of the benchmark window (unix timestamp)
    #[arg(long)]
    start: f64,
    /// End of the benchmark window (unix timestamp)
    #[arg(long)]
    end: f64,
    /// Query step in seconds
    #[arg(long, default_value_t = report::DEFAULT_STEP)]
    step: u64,
    /// Kubernetes context [default: minikube]
    #[arg(long)]
    kube_context: Option<String>,
    /// Kubernetes namespace [default: yugabyte-test]
    #[arg(long)]
    namespace: Option<String>,
    /// Helm release name; prometheus runs as deployment/<release-name>-prometheus [default: yb-bench]
    #[arg(long)]
    release_name: Option<String>,
    /// Prometheus URL, as seen from inside the cluster [default: http://yb-bench-prometheus:9090]
    #[arg(long)]
    prometheus_url: Option<String>,
    /// Pod name patterns to monitor
    #[arg(long, num_args = 1.., default_values = report::DEFAULT_PODS)]
    pods: Vec<String>,
    /// Rate metric expression (can be repeated)
    #[arg(long = "rate-of", value_name = "EXPRESSION")]
    rate_metrics: Vec<String>,
    /// Total metric expression (can be repeated)
    #[arg(long = "total-of", value_name = "EXPRESSION")]
    total_metrics: Vec<String>,
    /// Report title
    #[arg(long, default_value = report::DEFAULT_TITLE)]
    title: String,
    /// Output directory
    #[arg(long, default_value = report::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
    /// Report template [default: templates/report_template.html]
    #[arg(long)]
    template: Option<String>,
    /// How prometheus is reached
    #[arg(long, value_enum, default_value_t = FetchMode::Kubectl)]
    fetch_mode: FetchMode,
    /// Timeout in seconds for every kubectl or http call
    #[arg(long, default_value_t = report::DEFAULT_FETCH_TIMEOUT_SECONDS)]
    fetch_timeout: u64,
    /// Write the kubernetes and prometheus settings to .env
    #[arg(long)]
    write_dotenv: bool,
}

fn run(options: Opts) -> Result<()> {
    let mut changed_options = BTreeMap::new();

    let config = ReportConfig {
        start_time: options.start,
        end_time: options.end,
        step: options.step,
        kube_context: utility::set_option(&options.kube_context, utility::ENV_KUBE_CONTEXT, report::DEFAULT_KUBE_CONTEXT, &mut changed_options),
        namespace: utility::set_option(&options.namespace, utility::ENV_NAMESPACE, report::DEFAULT_NAMESPACE, &mut changed_options),
        release_name: utility::set_option(&options.release_name, utility::ENV_RELEASE_NAME, report::DEFAULT_RELEASE_NAME, &mut changed_options),
        prometheus_url: utility::set_option(&options.prometheus_url, utility::ENV_PROMETHEUS_URL, report::DEFAULT_PROMETHEUS_URL, &mut changed_options),
        pods: options.pods,
        rate_metrics: options.rate_metrics,
        total_metrics: options.total_metrics,
        title: options.title,
        output_dir: options.output_dir,
        template: PathBuf::from(utility::set_option(&options.template, utility::ENV_TEMPLATE, report::DEFAULT_TEMPLATE, &mut changed_options)),
        fetch_mode: options.fetch_mode,
        fetch_timeout: Duration::from_secs(options.fetch_timeout),
    };
    config.validate()?;
    utility::dotenv_writer(options.write_dotenv, Path::new(".env"), &changed_options)?;

    info!("begin report: {:?}", config);
    let timer = Instant::now();

    let generator = ReportGenerator::new(config)?;
    let html = generator.generate_report()?;
    generator.save_report(&html)?;

    info!("end report: {:?}", timer.elapsed());
    Ok(())
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let options = Opts::parse();

    if let Err(e) = run(options) {
        eprintln!("{} {:#}", "Error:".red(), e);
        process::exit(1);
    }
}
