//! The structs
//!
use std::{fmt, io, time::Duration};

/// The reason a remote fetch did not produce a response body.
#[derive(Debug)]
pub enum FetchError {
    /// The program could not be started at all.
    Spawn { program: String, source: io::Error },
    /// The program did not finish within the timeout, and has been killed.
    Timeout { program: String, timeout: Duration },
    /// The program finished with a non-zero exit code (None when killed by a signal).
    Exit { program: String, code: Option<i32>, stderr: String },
    /// Waiting for the program failed.
    Wait { program: String, source: io::Error },
    /// A direct http request failed or returned a non success status.
    Http(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Spawn { program, source } => write!(f, "cannot execute {}: {}", program, source),
            FetchError::Timeout { program, timeout } => write!(f, "{} timed out after {:?}", program, timeout),
            FetchError::Exit { program, code: Some(code), stderr } => write!(f, "{} exited with code {}: {}", program, code, stderr.trim()),
            FetchError::Exit { program, code: None, stderr } => write!(f, "{} terminated by signal: {}", program, stderr.trim()),
            FetchError::Wait { program, source } => write!(f, "error waiting for {}: {}", program, source),
            FetchError::Http(message) => write!(f, "http request failed: {}", message),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetch a URL by running `wget` inside the prometheus deployment with `kubectl exec`.
///
/// The command that is executed is:
/// ```text
/// kubectl --context <kube_context> exec -n <namespace> deployment/<release_name>-prometheus -- wget -q -O - <url>
/// ```
/// The prometheus image does not carry curl, which is why wget is used.
#[derive(Debug, Clone)]
pub struct KubectlExec {
    pub kube_context: String,
    pub namespace: String,
    pub release_name: String,
    pub timeout: Duration,
}

/// Fetch a URL directly with a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct DirectHttp {
    pub(crate) client: reqwest::blocking::Client,
}

/// How the prometheus API is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchMode {
    /// kubectl exec into the prometheus pod, and run wget there.
    Kubectl,
    /// http request from this machine.
    Direct,
}
