//! The structs
//!
use std::time::Duration;
use crate::topology::KubectlRunner;

/// Replica count and container resources of a statefulset.
///
/// This is read with the following jsonpath, which returns the fields comma separated:
/// ```text
/// {.spec.replicas},{.spec.template.spec.containers[0].resources.requests.cpu},
/// {.spec.template.spec.containers[0].resources.requests.memory},
/// {.spec.template.spec.containers[0].resources.limits.cpu},
/// {.spec.template.spec.containers[0].resources.limits.memory}
/// ```
/// A field that could not be read is `None`, and is shown as "N/A".
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSpec {
    pub replicas: Option<u32>,
    pub cpu_request: Option<String>,
    pub mem_request: Option<String>,
    pub cpu_limit: Option<String>,
    pub mem_limit: Option<String>,
}
/// Storage class and requested size of the tablet server persistent volume claims.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSpec {
    pub storage_class: Option<String>,
    pub size: Option<String>,
}
/// The cluster topology as shown in the report.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySpec {
    pub yugabyte_version: Option<String>,
    pub master: RoleSpec,
    pub tserver: RoleSpec,
    pub storage: StorageSpec,
}

/// Runs kubectl against the cluster namespace.
#[derive(Debug, Clone)]
pub struct KubectlCli {
    pub kube_context: String,
    pub namespace: String,
    pub timeout: Duration,
}

/// Collects the [TopologySpec] with a [KubectlRunner].
pub struct TopologyCollector {
    pub(crate) runner: Box<dyn KubectlRunner>,
}
