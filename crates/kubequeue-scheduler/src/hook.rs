//! Environment-gated enqueue hook for queue producers.

use kubequeue_config::Settings;
use kubequeue_core::{ManifestProvider, Result};
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::JobSubmitter;

/// Runs a [`JobSubmitter`] only in the environments the settings allow.
pub struct EnqueueHook {
    submitter: Arc<dyn JobSubmitter>,
    settings: Settings,
}

impl EnqueueHook {
    pub fn new(submitter: Arc<dyn JobSubmitter>, settings: Settings) -> Self {
        Self {
            submitter,
            settings,
        }
    }

    /// Call before the work item is stored.
    ///
    /// `None` means the hook is inactive in `environment` and nothing ran.
    pub async fn before_enqueue(
        &self,
        provider: &dyn ManifestProvider,
        environment: Option<&str>,
    ) -> Result<Option<bool>> {
        if !self.settings.is_active_in(environment) {
            debug!(?environment, "Enqueue hook inactive in this environment");
            return Ok(None);
        }
        self.submitter.on_enqueue(provider).await.map(Some)
    }
}
