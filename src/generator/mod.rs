//! Module that ties a report run together: topology, metric collection, rendering and saving.
//!
mod structs;
mod functions;

pub use structs::*;
