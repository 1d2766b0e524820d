//! The structs
//!
use std::{path::PathBuf, time::Duration};
use crate::remote::FetchMode;

/// Everything a report run needs to know, set once from the command line.
///
/// `start_time` and `end_time` are unix epoch seconds, `step` is the query resolution in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub start_time: f64,
    pub end_time: f64,
    pub step: u64,
    pub kube_context: String,
    pub namespace: String,
    pub release_name: String,
    pub prometheus_url: String,
    pub pods: Vec<String>,
    pub rate_metrics: Vec<String>,
    pub total_metrics: Vec<String>,
    pub title: String,
    pub output_dir: PathBuf,
    pub template: PathBuf,
    pub fetch_mode: FetchMode,
    pub fetch_timeout: Duration,
}

/// The values that are put into the template.
/// All fields except `metrics_json` are html, and are escaped where they contain user or cluster data.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub pods: String,
    pub cluster_spec: String,
    pub summary_table: String,
    pub metrics_json: String,
}
