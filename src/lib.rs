//! Reporting for YugabyteDB benchmark runs.
//!
//! The report generator reads the container metrics and any extra metrics of a benchmark window from prometheus,
//! the cluster topology with kubectl, and renders both into an html report.
//! The report parser reads a report directory back out: the node specs, the embedded metrics and the sysbench results.
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate serde_derive;
extern crate csv;

pub mod series;
pub mod remote;
pub mod prometheus;
pub mod topology;
pub mod aggregate;
pub mod report;
pub mod generator;
pub mod parser;
pub mod utility;
