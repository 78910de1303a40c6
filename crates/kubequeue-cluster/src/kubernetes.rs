//! kube-rs backed job and pod handles.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kubequeue_core::manifest;
use kubequeue_core::{
    ApiScope, ClusterConnector, Error, JobApi, LabelSelector, ObjectRef, PodApi, ResourceKind,
    Result,
};
use std::sync::Arc;

use crate::resolver::ClientResolver;

/// Job handle addressed to the batch API group.
#[derive(Clone)]
pub struct KubeJobs {
    client: Client,
}

impl KubeJobs {
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobApi for KubeJobs {
    async fn list_jobs(
        &self,
        selector: &LabelSelector,
        namespace: Option<&str>,
    ) -> Result<Vec<Job>> {
        let api: Api<Job> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let list = api
            .list(&ListParams::default().labels(selector.as_str()))
            .await
            .map_err(|e| Error::List {
                kind: ResourceKind::Job,
                message: e.to_string(),
            })?;
        Ok(list.items)
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::background())
            .await
            .map_err(|e| delete_error(ResourceKind::Job, name, namespace, e))?;
        Ok(())
    }

    async fn create_job(&self, job: &Job) -> Result<Job> {
        let namespace = manifest::namespace(job);
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), job)
            .await
            .map_err(|e| Error::Submission {
                name: job.metadata.name.clone().unwrap_or_default(),
                namespace: namespace.to_string(),
                message: e.to_string(),
            })
    }
}

/// Pod handle addressed to the core API group.
#[derive(Clone)]
pub struct KubePods {
    client: Client,
}

impl KubePods {
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodApi for KubePods {
    async fn list_pods(&self, selector: &LabelSelector) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default().labels(selector.as_str()))
            .await
            .map_err(|e| Error::List {
                kind: ResourceKind::Pod,
                message: e.to_string(),
            })?;
        Ok(list.items)
    }

    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| delete_error(ResourceKind::Pod, name, namespace, e))?;
        Ok(())
    }
}

/// Resolves kube-backed handles from local credentials.
pub struct KubeConnector {
    resolver: ClientResolver,
}

impl KubeConnector {
    pub fn new(resolver: ClientResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn jobs(&self) -> Result<Option<Arc<dyn JobApi>>> {
        let client = self.resolver.resolve(ApiScope::Batch).await?;
        Ok(client.map(|c| Arc::new(KubeJobs::with_client(c)) as Arc<dyn JobApi>))
    }

    async fn pods(&self) -> Result<Option<Arc<dyn PodApi>>> {
        let client = self.resolver.resolve(ApiScope::Core).await?;
        Ok(client.map(|c| Arc::new(KubePods::with_client(c)) as Arc<dyn PodApi>))
    }
}

fn delete_error(kind: ResourceKind, name: &str, namespace: &str, err: kube::Error) -> Error {
    Error::Delete {
        target: ObjectRef {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        message: err.to_string(),
    }
}
