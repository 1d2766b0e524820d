//! Module for fetching a URL that is only reachable from inside the kubernetes cluster.
//!
//! The default way is to run `wget` inside the prometheus pod via `kubectl exec`,
//! the alternative is a direct http request for when the network allows it.
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
