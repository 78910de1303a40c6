//! Cluster and manifest-provider traits.
//!
//! The dispatcher only talks to the cluster through these traits, so the
//! kube-backed implementation and in-memory fakes are interchangeable.

use async_trait::async_trait;
use derive_more::Display;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;

use crate::{LabelSelector, Result};

/// API group a handle is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ApiScope {
    /// `/apis/batch`, for jobs.
    #[display("batch")]
    Batch,
    /// The core `/api` group, for pods.
    #[display("core")]
    Core,
}

/// Operations on batch job resources.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// List jobs matching `selector`, across all namespaces when `namespace` is `None`.
    async fn list_jobs(&self, selector: &LabelSelector, namespace: Option<&str>)
    -> Result<Vec<Job>>;

    /// Delete a job by name and namespace.
    async fn delete_job(&self, name: &str, namespace: &str) -> Result<()>;

    /// Create a job in the namespace named by its metadata.
    async fn create_job(&self, job: &Job) -> Result<Job>;
}

/// Operations on pod resources.
#[async_trait]
pub trait PodApi: Send + Sync {
    /// List pods matching `selector` across all namespaces.
    async fn list_pods(&self, selector: &LabelSelector) -> Result<Vec<Pod>>;

    /// Delete a pod by name and namespace.
    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<()>;
}

/// Resolves scoped cluster handles.
///
/// `Ok(None)` means no credential source was found. Callers turn that into
/// [`crate::Error::Connection`] on first use.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn jobs(&self) -> Result<Option<Arc<dyn JobApi>>>;

    async fn pods(&self) -> Result<Option<Arc<dyn PodApi>>>;
}

/// Supplies the job template for an enqueued work item.
pub trait ManifestProvider: Send + Sync {
    /// The template. Callers copy it before mutating.
    fn job_manifest(&self) -> Result<&Job>;
}

impl ManifestProvider for Job {
    fn job_manifest(&self) -> Result<&Job> {
        Ok(self)
    }
}
