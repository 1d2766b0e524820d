//! Module for prometheus range queries (`/api/v1/query_range`).
//!
mod structs;
mod functions;

pub use structs::*;
