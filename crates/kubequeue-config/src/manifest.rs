//! Job manifests loaded from files.

use crate::{ConfigError, ConfigResult};
use kubequeue_core::{Job, ManifestProvider};
use std::path::Path;

/// A job template read once from a JSON or YAML file.
#[derive(Debug, Clone)]
pub struct FileManifest {
    job: Job,
}

impl FileManifest {
    /// Load a manifest, choosing the format from the file extension.
    ///
    /// `.json` files are parsed as JSON; anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let job = if is_json {
            parse_json(&text)
        } else {
            parse_yaml(&text)
        }
        .map_err(|message| ConfigError::Manifest {
            path: path.display().to_string(),
            message,
        })?;

        Ok(Self { job })
    }

    pub fn job(&self) -> &Job {
        &self.job
    }
}

impl ManifestProvider for FileManifest {
    fn job_manifest(&self) -> kubequeue_core::Result<&Job> {
        Ok(&self.job)
    }
}

fn parse_json(text: &str) -> Result<Job, String> {
    serde_json::from_str(text).map_err(|e| e.to_string())
}

fn parse_yaml(text: &str) -> Result<Job, String> {
    serde_yaml::from_str(text).map_err(|e| e.to_string())
}
