//! In-memory cluster used by tests across the workspace.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobSpec, JobStatus};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::labels::{GROUP_LABEL, JOB_MARKER, MANAGED_LABEL, POD_MARKER};
use crate::{
    ClusterConnector, Error, JobApi, LabelSelector, ObjectRef, PodApi, ResourceKind, Result,
    manifest,
};

#[derive(Default)]
struct State {
    jobs: Vec<Job>,
    pods: Vec<Pod>,
    created: Vec<Job>,
    deleted: Vec<ObjectRef>,
    failing_deletes: HashSet<String>,
    fail_lists: bool,
    fail_creates: bool,
}

/// A cluster holding jobs and pods in memory.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_job(&self, job: Job) {
        self.state().jobs.push(job);
    }

    pub fn add_pod(&self, pod: Pod) {
        self.state().pods.push(pod);
    }

    /// Make every delete of a resource with this name fail.
    pub fn fail_delete_of(&self, name: &str) {
        self.state().failing_deletes.insert(name.to_string());
    }

    pub fn fail_lists(&self) {
        self.state().fail_lists = true;
    }

    pub fn fail_creates(&self) {
        self.state().fail_creates = true;
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.state().jobs.clone()
    }

    pub fn pods(&self) -> Vec<Pod> {
        self.state().pods.clone()
    }

    /// Jobs submitted through [`JobApi::create_job`].
    pub fn created(&self) -> Vec<Job> {
        self.state().created.clone()
    }

    /// Successful deletions, in order.
    pub fn deleted(&self) -> Vec<ObjectRef> {
        self.state().deleted.clone()
    }

    fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> Result<()> {
        let mut state = self.state();
        let target = ObjectRef {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        };
        if state.failing_deletes.contains(name) {
            return Err(Error::Delete {
                target,
                message: "forbidden".to_string(),
            });
        }

        let is_target = |meta: &ObjectMeta| {
            meta.name.as_deref() == Some(name) && meta.namespace.as_deref() == Some(namespace)
        };
        let before = state.jobs.len() + state.pods.len();
        match kind {
            ResourceKind::Job => state.jobs.retain(|j| !is_target(&j.metadata)),
            ResourceKind::Pod => state.pods.retain(|p| !is_target(&p.metadata)),
        }
        if state.jobs.len() + state.pods.len() == before {
            return Err(Error::Delete {
                target,
                message: "not found".to_string(),
            });
        }

        state.deleted.push(target);
        Ok(())
    }
}

#[async_trait]
impl JobApi for FakeCluster {
    async fn list_jobs(
        &self,
        selector: &LabelSelector,
        namespace: Option<&str>,
    ) -> Result<Vec<Job>> {
        let state = self.state();
        if state.fail_lists {
            return Err(Error::List {
                kind: ResourceKind::Job,
                message: "connection refused".to_string(),
            });
        }
        Ok(state
            .jobs
            .iter()
            .filter(|j| selector.matches(j.metadata.labels.as_ref().unwrap_or(&BTreeMap::new())))
            .filter(|j| namespace.is_none_or(|ns| j.metadata.namespace.as_deref() == Some(ns)))
            .cloned()
            .collect())
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<()> {
        self.delete(ResourceKind::Job, name, namespace)
    }

    async fn create_job(&self, job: &Job) -> Result<Job> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(Error::Submission {
                name: job.metadata.name.clone().unwrap_or_default(),
                namespace: manifest::namespace(job).to_string(),
                message: "admission webhook denied the request".to_string(),
            });
        }
        state.jobs.push(job.clone());
        state.created.push(job.clone());
        Ok(job.clone())
    }
}

#[async_trait]
impl PodApi for FakeCluster {
    async fn list_pods(&self, selector: &LabelSelector) -> Result<Vec<Pod>> {
        let state = self.state();
        if state.fail_lists {
            return Err(Error::List {
                kind: ResourceKind::Pod,
                message: "connection refused".to_string(),
            });
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| selector.matches(p.metadata.labels.as_ref().unwrap_or(&BTreeMap::new())))
            .cloned()
            .collect())
    }

    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<()> {
        self.delete(ResourceKind::Pod, name, namespace)
    }
}

/// Hands out a [`FakeCluster`], or nothing when built with [`FakeConnector::absent`].
pub struct FakeConnector {
    cluster: Option<Arc<FakeCluster>>,
    resolutions: AtomicUsize,
}

impl FakeConnector {
    pub fn new(cluster: Arc<FakeCluster>) -> Self {
        Self {
            cluster: Some(cluster),
            resolutions: AtomicUsize::new(0),
        }
    }

    /// A connector with no credentials.
    pub fn absent() -> Self {
        Self {
            cluster: None,
            resolutions: AtomicUsize::new(0),
        }
    }

    /// How many times a handle was resolved, across both scopes.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterConnector for FakeConnector {
    async fn jobs(&self) -> Result<Option<Arc<dyn JobApi>>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(self.cluster.clone().map(|c| c as Arc<dyn JobApi>))
    }

    async fn pods(&self) -> Result<Option<Arc<dyn PodApi>>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(self.cluster.clone().map(|c| c as Arc<dyn PodApi>))
    }
}

/// A managed job in `default` belonging to `group`.
pub fn managed_job(name: &str, group: &str, completions: i32, succeeded: i32) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(manifest::DEFAULT_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([
                (MANAGED_LABEL.to_string(), JOB_MARKER.to_string()),
                (GROUP_LABEL.to_string(), group.to_string()),
            ])),
            ..Default::default()
        },
        spec: Some(JobSpec {
            completions: Some(completions),
            ..Default::default()
        }),
        status: Some(JobStatus {
            succeeded: (succeeded > 0).then_some(succeeded),
            ..Default::default()
        }),
    }
}

/// A managed pod in `default` reporting `phase`.
pub fn managed_pod(name: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(manifest::DEFAULT_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_LABEL.to_string(),
                POD_MARKER.to_string(),
            )])),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
