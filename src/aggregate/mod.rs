//! Module to run the metric queries of a report and summarize them into min/avg/max/total.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
