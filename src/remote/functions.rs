//! The impls and functions
//!
use std::{io::Read, process::{Command, Stdio}, thread, time::{Duration, Instant}};
use log::*;
use anyhow::{Context, Result};
use crate::remote::{DirectHttp, FetchError, KubectlExec};

/// How often a running child process is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A capability to get the body of a URL.
///
/// Failures are returned as a [FetchError] value: the caller decides how to degrade.
pub trait RemoteFetch {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Run a program with a hard timeout, and return its stdout.
///
/// stdout and stderr are drained on separate threads: prometheus responses easily exceed the pipe buffer,
/// and a child blocked on a full pipe would otherwise never exit.
/// When the timeout expires the child is killed.
pub fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, FetchError>
{
    debug!("run: {} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| FetchError::Spawn { program: program.to_string(), source })?;

    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                if let Err(e) = child.kill() {
                    debug!("kill {}: {}", program, e);
                }
                // reap the child; the reader threads are left to finish on their own.
                let _ = child.wait();
                return Err(FetchError::Timeout { program: program.to_string(), timeout });
            },
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(FetchError::Wait { program: program.to_string(), source }),
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if status.success() {
        Ok(stdout)
    } else {
        Err(FetchError::Exit { program: program.to_string(), code: status.code(), stderr })
    }
}

fn drain_pipe<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<String>
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buffer) {
                debug!("error reading pipe: {}", e);
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

impl KubectlExec {
    pub fn new(
        kube_context: &str,
        namespace: &str,
        release_name: &str,
        timeout: Duration,
    ) -> Self
    {
        KubectlExec {
            kube_context: kube_context.to_string(),
            namespace: namespace.to_string(),
            release_name: release_name.to_string(),
            timeout,
        }
    }
    /// The kubectl arguments to run wget for `url` inside the prometheus pod.
    pub fn exec_args(
        &self,
        url: &str,
    ) -> Vec<String>
    {
        vec![
            "--context".to_string(), self.kube_context.clone(),
            "exec".to_string(),
            "-n".to_string(), self.namespace.clone(),
            format!("deployment/{}-prometheus", self.release_name),
            "--".to_string(),
            "wget".to_string(), "-q".to_string(), "-O".to_string(), "-".to_string(),
            url.to_string(),
        ]
    }
}

impl RemoteFetch for KubectlExec {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        run_command("kubectl", &self.exec_args(url), self.timeout)
            .map_err(|e| {
                warn!("kubectl exec wget {}: {}", url, e);
                e
            })
    }
}

impl DirectHttp {
    pub fn new(
        timeout: Duration,
    ) -> Result<Self>
    {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Unable to create http client")?;
        Ok(DirectHttp { client })
    }
}

impl RemoteFetch for DirectHttp {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client
            .get(url)
            .send()
            .map_err(|e| {
                warn!("http get {}: {}", url, e);
                FetchError::Http(e.to_string())
            })?;
        if !response.status().is_success() {
            warn!("Non success response: {} = {}", url, response.status());
            return Err(FetchError::Http(format!("status {}", response.status())));
        }
        debug!("Success response: {} = {}", url, response.status());
        response.text().map_err(|e| FetchError::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn unit_exec_args() {
        let kubectl = KubectlExec::new("minikube", "yugabyte-test", "yb-bench", Duration::from_secs(30));
        let args = kubectl.exec_args("http://yb-bench-prometheus:9090/api/v1/query_range?query=up");
        assert_eq!(args.join(" "), "--context minikube exec -n yugabyte-test deployment/yb-bench-prometheus -- wget -q -O - http://yb-bench-prometheus:9090/api/v1/query_range?query=up");
    }

    #[cfg(unix)]
    #[test]
    fn unit_run_command_stdout() {
        let output = run_command("sh", &sh("echo hello"), Duration::from_secs(10)).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn unit_run_command_large_output() {
        // more than a pipe buffer worth of output must not stall the child.
        let output = run_command("sh", &sh("head -c 300000 /dev/zero | tr '\\0' 'x'"), Duration::from_secs(10)).unwrap();
        assert_eq!(output.len(), 300_000);
    }

    #[cfg(unix)]
    #[test]
    fn unit_run_command_non_zero_exit() {
        let result = run_command("sh", &sh("echo oops >&2; exit 3"), Duration::from_secs(10));
        match result {
            Err(FetchError::Exit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops\n");
            },
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn unit_run_command_timeout() {
        let timer = Instant::now();
        let result = run_command("sh", &sh("exec sleep 5"), Duration::from_millis(200));
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
        assert!(timer.elapsed() < Duration::from_secs(4));
    }

    /// Serve a single http request on a local port with a fixed response.
    fn serve_once(response: &'static str) -> String {
        use std::{io::Write, net::TcpListener};
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0_u8; 4096];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/api/v1/query_range?query=up", address)
    }

    #[test]
    fn unit_direct_http_success() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 20\r\nConnection: close\r\n\r\n{\"status\":\"success\"}");
        let fetcher = DirectHttp::new(Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.fetch(&url).unwrap(), "{\"status\":\"success\"}");
    }

    #[test]
    fn unit_direct_http_non_success_status() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let fetcher = DirectHttp::new(Duration::from_secs(5)).unwrap();
        match fetcher.fetch(&url) {
            Err(FetchError::Http(message)) => assert!(message.contains("503")),
            other => panic!("expected http error, got {:?}", other),
        }
    }

    #[test]
    fn unit_direct_http_connection_refused() {
        // bind and release a port, so nothing listens on it.
        let address = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let fetcher = DirectHttp::new(Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch(&format!("http://{}/api/v1/query_range?query=up", address));
        assert!(matches!(result, Err(FetchError::Http(_))));
    }

    #[test]
    fn unit_run_command_missing_program() {
        let result = run_command("yb-bench-report-no-such-program", &[], Duration::from_secs(1));
        assert!(matches!(result, Err(FetchError::Spawn { .. })));
    }
}
