//! Module for reading a report directory back out:
//! the node spec table, the metrics embedded in `report.html` and the sysbench console output.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
