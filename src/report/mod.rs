//! Module for the report configuration and for rendering the html report from a template.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
