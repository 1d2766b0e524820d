//! The impls and functions
//!
use std::time::{Duration, Instant};
use log::*;
use crate::remote;
use crate::topology::{KubectlCli, RoleSpec, StorageSpec, TopologyCollector, TopologySpec};

/// The statefulset and label names of the YugabyteDB helm chart.
pub const MASTER_STATEFULSET: &str = "yb-master";
pub const TSERVER_STATEFULSET: &str = "yb-tserver";
pub const TSERVER_SELECTOR: &str = "app=yb-tserver";

const STATEFULSET_JSONPATH: &str = "jsonpath={.spec.replicas},{.spec.template.spec.containers[0].resources.requests.cpu},\
{.spec.template.spec.containers[0].resources.requests.memory},\
{.spec.template.spec.containers[0].resources.limits.cpu},\
{.spec.template.spec.containers[0].resources.limits.memory}";
const PVC_JSONPATH: &str = "jsonpath={.items[0].spec.storageClassName},{.items[0].spec.resources.requests.storage}";
const IMAGE_JSONPATH: &str = "jsonpath={.items[0].spec.containers[0].image}";

/// Something that can run a kubectl command in the cluster namespace.
/// Returns the trimmed stdout, or None on any failure or empty output.
pub trait KubectlRunner {
    fn run(&self, args: &[&str]) -> Option<String>;
}

impl KubectlCli {
    pub fn new(
        kube_context: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Self
    {
        KubectlCli {
            kube_context: kube_context.to_string(),
            namespace: namespace.to_string(),
            timeout,
        }
    }
}

impl KubectlRunner for KubectlCli {
    fn run(&self, args: &[&str]) -> Option<String> {
        let mut kubectl_args = vec![
            "--context".to_string(), self.kube_context.clone(),
            "-n".to_string(), self.namespace.clone(),
        ];
        kubectl_args.extend(args.iter().map(|arg| arg.to_string()));
        match remote::run_command("kubectl", &kubectl_args, self.timeout) {
            Ok(output) if !output.trim().is_empty() => Some(output.trim().to_string()),
            Ok(_) => {
                debug!("kubectl {}: empty output", args.join(" "));
                None
            },
            Err(e) => {
                warn!("kubectl {}: {}", args.join(" "), e);
                None
            },
        }
    }
}

impl TopologyCollector {
    pub fn new(runner: Box<dyn KubectlRunner>) -> Self {
        TopologyCollector { runner }
    }
    /// Read the master and tablet server specifications, the storage and the version.
    /// Each part is read independently: a failed read leaves only its own fields unset.
    pub fn collect(&self) -> TopologySpec {
        println!("Collecting cluster specifications...");
        info!("begin topology collect");
        let timer = Instant::now();

        let topology = TopologySpec {
            master: self.read_statefulset(MASTER_STATEFULSET),
            tserver: self.read_statefulset(TSERVER_STATEFULSET),
            storage: self.read_storage(TSERVER_SELECTOR),
            yugabyte_version: self.read_version(TSERVER_SELECTOR),
        };

        info!("end topology collect: {:?}", timer.elapsed());
        topology
    }
    fn read_statefulset(
        &self,
        name: &str,
    ) -> RoleSpec
    {
        self.runner.run(&["get", "statefulset", name, "-o", STATEFULSET_JSONPATH])
            .map(|output| parse_statefulset(&output))
            .unwrap_or_default()
    }
    fn read_storage(
        &self,
        selector: &str,
    ) -> StorageSpec
    {
        self.runner.run(&["get", "pvc", "-l", selector, "-o", PVC_JSONPATH])
            .map(|output| parse_pvc(&output))
            .unwrap_or_default()
    }
    fn read_version(
        &self,
        selector: &str,
    ) -> Option<String>
    {
        self.runner.run(&["get", "pod", "-l", selector, "-o", IMAGE_JSONPATH])
            .and_then(|image| version_from_image(&image))
    }
}

fn non_empty(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() { None } else { Some(field.to_string()) }
}

/// Parse `replicas,cpu_request,mem_request,cpu_limit,mem_limit`.
/// Fewer than five fields means the output is not what was asked for, and nothing is set.
pub fn parse_statefulset(output: &str) -> RoleSpec {
    let fields: Vec<&str> = output.split(',').collect();
    if fields.len() < 5 {
        debug!("statefulset output has {} fields: {}", fields.len(), output);
        return RoleSpec::default();
    }
    RoleSpec {
        replicas: fields[0].trim().parse().ok(),
        cpu_request: non_empty(fields[1]),
        mem_request: non_empty(fields[2]),
        cpu_limit: non_empty(fields[3]),
        mem_limit: non_empty(fields[4]),
    }
}

/// Parse `storage_class,size`.
pub fn parse_pvc(output: &str) -> StorageSpec {
    let fields: Vec<&str> = output.split(',').collect();
    if fields.len() < 2 {
        debug!("pvc output has {} fields: {}", fields.len(), output);
        return StorageSpec::default();
    }
    StorageSpec {
        storage_class: non_empty(fields[0]),
        size: non_empty(fields[1]),
    }
}

/// The version is the tag of the image: everything after the last colon.
/// `yugabytedb/yugabyte:2.20.0.0-b100` gives `2.20.0.0-b100`.
pub fn version_from_image(image: &str) -> Option<String> {
    image.trim()
        .rsplit_once(':')
        .and_then(|(_, tag)| non_empty(tag))
}
