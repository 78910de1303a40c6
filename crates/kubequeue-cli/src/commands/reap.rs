//! Sweep command.

use anyhow::{Context, Result};
use kubequeue_cluster::{ClientResolver, KubeConnector};
use kubequeue_config::Settings;
use kubequeue_scheduler::{Dispatcher, ReapReport};
use std::sync::Arc;

/// Delete finished jobs and pods without submitting anything.
pub async fn reap(settings: Settings) -> Result<()> {
    let connector = KubeConnector::new(ClientResolver::new(settings.credentials.clone()));
    let dispatcher = Dispatcher::from_settings(Arc::new(connector), &settings);

    let report = dispatcher.sweep().await.context("Sweep failed")?;

    print_report("jobs", &report.jobs);
    print_report("pods", &report.pods);
    Ok(())
}

fn print_report(kind: &str, report: &ReapReport) {
    println!("{}: {} deleted, {} failed", kind, report.deleted.len(), report.failed.len());
    for target in &report.deleted {
        println!("  ✓ {}", target);
    }
    for (target, error) in &report.failed {
        println!("  ✗ {}: {}", target, error);
    }
}
