//! Single enqueue command.

use anyhow::{Context, Result};
use kubequeue_cluster::{ClientResolver, KubeConnector};
use kubequeue_config::{FileManifest, Settings};
use kubequeue_scheduler::{Dispatcher, EnqueueHook};
use std::sync::Arc;
use tracing::debug;

/// Run the enqueue hook once for the manifest at `manifest_path`.
pub async fn enqueue(settings: Settings, environment: Option<&str>, manifest_path: &str) -> Result<()> {
    let manifest = FileManifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest: {}", manifest_path))?;
    debug!(manifest = manifest_path, "Loaded job manifest");

    let connector = KubeConnector::new(ClientResolver::new(settings.credentials.clone()));
    let dispatcher = Dispatcher::from_settings(Arc::new(connector), &settings);
    let hook = EnqueueHook::new(Arc::new(dispatcher), settings);

    match hook
        .before_enqueue(&manifest, environment)
        .await
        .context("Enqueue failed")?
    {
        Some(true) => println!("Job created"),
        Some(false) => println!("Group at capacity, no job created"),
        None => println!(
            "Inactive in environment {}, nothing to do",
            environment.unwrap_or("<unset>")
        ),
    }
    Ok(())
}
