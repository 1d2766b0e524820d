use std::{io::{self, Write}, path::PathBuf, process};
use clap::Parser;
use colored::Colorize;
use log::*;

use yb_bench_report::parser;

/// Parse a benchmark report folder for tablet server metrics and sysbench results.
///
/// Example: yb_bench_report_parser reports/20260121_0643
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Opts {
    /// The report folder, holding report.html, sysbench_output.txt and optionally RUN_NODE_SPEC.txt
    report_path: PathBuf,
}

fn main() {
    env_logger::init();

    // Any usage error is exit code 1, help and version are not errors.
    let options = match Opts::try_parse() {
        Ok(options) => options,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        },
    };
    info!("report path: {}", options.report_path.display());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = parser::write_report_summary(&options.report_path, &mut out);
    let _ = out.flush();

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red(), e);
        process::exit(1);
    }
}
