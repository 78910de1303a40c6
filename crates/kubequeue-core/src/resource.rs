//! Resource references and finished-state predicates.

use derive_more::Display;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::str::FromStr;

/// Kind of cluster object this crate manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ResourceKind {
    #[display("job")]
    Job,
    #[display("pod")]
    Pod,
}

/// Name and namespace of a cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{kind} {namespace}/{name}")]
pub struct ObjectRef {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
}

impl ObjectRef {
    pub fn new(kind: ResourceKind, metadata: &ObjectMeta) -> Self {
        Self {
            kind,
            name: metadata.name.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
        }
    }

    pub fn job(job: &Job) -> Self {
        Self::new(ResourceKind::Job, &job.metadata)
    }

    pub fn pod(pod: &Pod) -> Self {
        Self::new(ResourceKind::Pod, &pod.metadata)
    }
}

/// Desired completion count. The API server defaults an unset value to 1.
pub fn job_completions(job: &Job) -> i32 {
    job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1)
}

/// Observed succeeded count. The API server omits it while zero.
pub fn job_succeeded(job: &Job) -> i32 {
    job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0)
}

/// A job is finished once its succeeded count reaches its completion count.
pub fn is_job_finished(job: &Job) -> bool {
    job_succeeded(job) == job_completions(job)
}

/// A pod is finished once it reports the `Succeeded` phase.
pub fn is_pod_finished(pod: &Pod) -> bool {
    PodPhase::of(pod) == Some(PodPhase::Succeeded)
}

/// Lifecycle phase reported in a pod's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Phase of `pod`, or `None` if the pod has no status yet.
    pub fn of(pod: &Pod) -> Option<Self> {
        pod.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .and_then(|p| p.parse().ok())
    }
}

impl FromStr for PodPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Running" => Ok(Self::Running),
            "Succeeded" => Ok(Self::Succeeded),
            "Failed" => Ok(Self::Failed),
            "Unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown pod phase: {other}")),
        }
    }
}
