//! CLI command implementations.

pub mod enqueue;
pub mod reap;

use anyhow::{Context, Result};
use kubequeue_config::Settings;
use kubequeue_config::system::load_settings;

/// Load settings from `path`, or defaults when no file was given.
pub fn settings(path: Option<&str>, max_workers: Option<u32>) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load settings: {}", path))?,
        None => Settings::default(),
    };

    if let Some(max) = max_workers {
        anyhow::ensure!(max > 0, "--max-workers must be positive");
        settings.max_workers = max;
    }
    Ok(settings)
}

pub fn validate(path: &str) -> Result<()> {
    match load_settings(path) {
        Ok(settings) => {
            println!("Configuration is valid");
            println!("  max workers: {}", settings.max_workers);
            if settings.environments.is_empty() {
                println!("  environments: all");
            } else {
                println!("  environments: {}", settings.environments.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
