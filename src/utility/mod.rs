//! Utilities for resolving the settings from the command line, `.env` and the defaults.
//!
mod functions;

pub use functions::*;
