//! Entry point invoked for each enqueued work item.

use async_trait::async_trait;
use kubequeue_config::Settings;
use kubequeue_core::{
    ApiScope, ClusterConnector, Error, JobApi, ManifestProvider, PodApi, Result, manifest, naming,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::admission::AdmissionController;
use crate::reaper::{SweepReport, reap_jobs, reap_pods};

/// Capability a queue producer calls before storing a work item.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Sweep finished resources and submit a job if the group has room.
    ///
    /// Returns `Ok(false)` when admission is denied.
    async fn on_enqueue(&self, provider: &dyn ManifestProvider) -> Result<bool>;
}

/// Reaps, admits, normalizes and submits.
///
/// Cluster handles are resolved on first use and reused for the lifetime of
/// the dispatcher.
pub struct Dispatcher {
    connector: Arc<dyn ClusterConnector>,
    admission: AdmissionController,
    unique_names: bool,
    jobs: OnceCell<Option<Arc<dyn JobApi>>>,
    pods: OnceCell<Option<Arc<dyn PodApi>>>,
}

impl Dispatcher {
    pub fn new(connector: Arc<dyn ClusterConnector>, admission: AdmissionController) -> Self {
        Self {
            connector,
            admission,
            unique_names: false,
            jobs: OnceCell::new(),
            pods: OnceCell::new(),
        }
    }

    pub fn from_settings(connector: Arc<dyn ClusterConnector>, settings: &Settings) -> Self {
        Self::new(connector, AdmissionController::from_settings(settings))
            .with_unique_names(settings.unique_names)
    }

    /// Append a random suffix to each submitted job's name.
    pub fn with_unique_names(mut self, enabled: bool) -> Self {
        self.unique_names = enabled;
        self
    }

    async fn jobs_api(&self) -> Result<Arc<dyn JobApi>> {
        let handle = self
            .jobs
            .get_or_try_init(|| self.connector.jobs())
            .await?;
        handle.clone().ok_or_else(|| no_credentials(ApiScope::Batch))
    }

    async fn pods_api(&self) -> Result<Arc<dyn PodApi>> {
        let handle = self
            .pods
            .get_or_try_init(|| self.connector.pods())
            .await?;
        handle.clone().ok_or_else(|| no_credentials(ApiScope::Core))
    }

    /// Run the job sweep, then the pod sweep.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let jobs = reap_jobs(self.jobs_api().await?.as_ref()).await?;
        let pods = reap_pods(self.pods_api().await?.as_ref()).await?;
        Ok(SweepReport { jobs, pods })
    }

    /// One enqueue: sweep, admit, normalize, submit.
    pub async fn dispatch(&self, provider: &dyn ManifestProvider) -> Result<bool> {
        self.sweep().await?;

        let mut job = provider.job_manifest()?.clone();
        manifest::ensure_namespace(&mut job);
        let group = manifest::group_name(&job)?.to_string();
        let namespace = manifest::namespace(&job).to_string();

        let jobs = self.jobs_api().await?;
        if !self
            .admission
            .is_admitted(jobs.as_ref(), &group, &namespace)
            .await?
        {
            info!(%group, %namespace, "Group at capacity, not creating job");
            return Ok(false);
        }

        manifest::add_labels(&mut job);
        manifest::ensure_term_on_empty(&mut job);
        manifest::ensure_restart_policy(&mut job);
        if self.unique_names {
            naming::append_unique_suffix(&mut job);
        }

        info!(%group, %namespace, "Creating job");
        let created = jobs.create_job(&job).await?;
        info!(
            job = created.metadata.name.as_deref().unwrap_or_default(),
            %namespace,
            "Job created"
        );
        Ok(true)
    }
}

#[async_trait]
impl JobSubmitter for Dispatcher {
    async fn on_enqueue(&self, provider: &dyn ManifestProvider) -> Result<bool> {
        self.dispatch(provider).await
    }
}

fn no_credentials(scope: ApiScope) -> Error {
    Error::Connection(format!("no cluster credentials found for {scope} API"))
}
