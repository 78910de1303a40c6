//! Per-group concurrency cap.

use kubequeue_config::{CapPolicy, Settings};
use kubequeue_core::resource::is_job_finished;
use kubequeue_core::{JobApi, LabelSelector, Result};
use tracing::info;

/// Decides whether a group has room for another job.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    max_workers: u32,
    policy: CapPolicy,
}

impl AdmissionController {
    pub fn new(max_workers: u32, policy: CapPolicy) -> Self {
        Self {
            max_workers,
            policy,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_workers, settings.cap_policy)
    }

    pub fn max_workers(&self) -> u32 {
        self.max_workers
    }

    /// Whether `group` in `namespace` may start another job.
    ///
    /// With [`CapPolicy::Exact`] a running count already above the cap is
    /// admitted again.
    pub async fn is_admitted(&self, jobs: &dyn JobApi, group: &str, namespace: &str) -> Result<bool> {
        let running = count_running(jobs, group, namespace).await?;
        let admitted = self.policy.has_room(running, self.max_workers);

        info!(
            group,
            namespace,
            running,
            max_workers = self.max_workers,
            admitted,
            "Admission decision"
        );
        Ok(admitted)
    }
}

/// Unfinished jobs of `group`, including ones that have not reported status yet.
pub async fn count_running(jobs: &dyn JobApi, group: &str, namespace: &str) -> Result<usize> {
    let listed = jobs
        .list_jobs(&LabelSelector::job_group(group), Some(namespace))
        .await?;
    Ok(listed.iter().filter(|job| !is_job_finished(job)).count())
}
