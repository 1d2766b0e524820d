//! Module for a single prometheus time series and the statistics taken from it.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
