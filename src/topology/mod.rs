//! Module for reading the cluster topology with kubectl:
//! the master and tablet server statefulsets, the tablet server volume claims and the YugabyteDB version.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
