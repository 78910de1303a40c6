//! Deletion of finished jobs and pods.

use futures::stream::{self, StreamExt};
use kubequeue_core::resource::{is_job_finished, is_pod_finished};
use kubequeue_core::{Error, JobApi, LabelSelector, ObjectRef, PodApi, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct ReapReport {
    pub deleted: Vec<ObjectRef>,
    /// Finished resources that could not be deleted.
    pub failed: Vec<(ObjectRef, Error)>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(mut self, target: ObjectRef, outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => {
                debug!(%target, "Reaped finished resource");
                self.deleted.push(target);
            }
            Err(e) => {
                warn!(%target, error = %e, "Cannot delete finished resource");
                self.failed.push((target, e));
            }
        }
        self
    }
}

/// Outcome of the job sweep followed by the pod sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub jobs: ReapReport,
    pub pods: ReapReport,
}

/// Delete every finished resource in `resources`.
///
/// A failed delete is recorded and the fold moves on to the next resource.
pub async fn reap<R, D, Fut>(
    resources: Vec<R>,
    finished: fn(&R) -> bool,
    to_ref: fn(&R) -> ObjectRef,
    delete: D,
) -> ReapReport
where
    D: Fn(ObjectRef) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let targets: Vec<ObjectRef> = resources.iter().filter(|&r| finished(r)).map(to_ref).collect();
    let delete = &delete;

    stream::iter(targets)
        .fold(ReapReport::default(), |report, target| async move {
            let outcome = delete(target.clone()).await;
            report.record(target, outcome)
        })
        .await
}

/// Sweep managed jobs whose succeeded count reached their completions.
pub async fn reap_jobs(jobs: &dyn JobApi) -> Result<ReapReport> {
    let listed = jobs.list_jobs(&LabelSelector::jobs(), None).await?;
    let report = reap(listed, is_job_finished, ObjectRef::job, |target| async move {
        jobs.delete_job(&target.name, &target.namespace).await
    })
    .await;
    Ok(report)
}

/// Sweep managed pods in the `Succeeded` phase.
pub async fn reap_pods(pods: &dyn PodApi) -> Result<ReapReport> {
    let listed = pods.list_pods(&LabelSelector::pods()).await?;
    let report = reap(listed, is_pod_finished, ObjectRef::pod, |target| async move {
        pods.delete_pod(&target.name, &target.namespace).await
    })
    .await;
    Ok(report)
}
