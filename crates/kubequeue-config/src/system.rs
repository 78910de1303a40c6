//! Settings parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
pub const DEFAULT_IN_CLUSTER_HOST: &str = "https://kubernetes";

/// Settings consumed by the dispatcher and its host hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum unfinished jobs per group.
    pub max_workers: u32,
    /// Environments the dispatcher runs in. Empty means every environment.
    pub environments: Vec<String>,
    /// How the running count is compared against `max_workers`.
    pub cap_policy: CapPolicy,
    /// Append a random suffix to each submitted job's name.
    pub unique_names: bool,
    pub credentials: CredentialPaths,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_workers: 1,
            environments: Vec::new(),
            cap_policy: CapPolicy::default(),
            unique_names: false,
            credentials: CredentialPaths::default(),
        }
    }
}

impl Settings {
    /// Whether the dispatcher should run in `environment`.
    ///
    /// An unknown environment, or an empty allow-list, is always active.
    pub fn is_active_in(&self, environment: Option<&str>) -> bool {
        match environment {
            Some(env) if !self.environments.is_empty() => {
                self.environments.iter().any(|e| e == env)
            }
            _ => true,
        }
    }
}

/// Comparison used by admission control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapPolicy {
    /// Deny only when the running count equals the cap.
    #[default]
    Exact,
    /// Deny whenever the running count is at or above the cap.
    AtLeast,
}

impl CapPolicy {
    /// Whether `running` jobs leave room for another under `max_workers`.
    pub fn has_room(self, running: usize, max_workers: u32) -> bool {
        let max = max_workers as usize;
        match self {
            CapPolicy::Exact => running != max,
            CapPolicy::AtLeast => running < max,
        }
    }
}

/// Local paths the cluster client resolver reads credentials from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPaths {
    /// In-cluster service account token.
    pub token_path: PathBuf,
    /// In-cluster CA bundle.
    pub ca_path: PathBuf,
    /// Operator kubeconfig; `None` when `HOME` is unset and none was configured.
    pub kubeconfig: Option<PathBuf>,
    /// API server address used with in-cluster credentials.
    pub in_cluster_host: String,
}

impl Default for CredentialPaths {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            ca_path: PathBuf::from(DEFAULT_CA_PATH),
            kubeconfig: std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".kube").join("config")),
            in_cluster_host: DEFAULT_IN_CLUSTER_HOST.to_string(),
        }
    }
}

/// Read and parse a settings file.
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let text = std::fs::read_to_string(path)?;
    parse_settings(&text)
}

/// Parse settings from KDL text.
pub fn parse_settings(kdl: &str) -> ConfigResult<Settings> {
    let doc: KdlDocument = kdl.parse()?;
    let mut settings = Settings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "kubequeue" => parse_dispatch(node, &mut settings)?,
            "credentials" => parse_credentials(node, &mut settings.credentials),
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(settings)
}

fn parse_dispatch(node: &KdlNode, settings: &mut Settings) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "max-workers" => {
                let value = get_first_integer_arg(child)
                    .ok_or_else(|| ConfigError::MissingField("max-workers value".to_string()))?;
                settings.max_workers = u32::try_from(value)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "max-workers".to_string(),
                        message: format!("expected a positive integer, got {}", value),
                    })?;
            }
            "environments" => {
                settings.environments = get_all_string_args(child);
            }
            "cap-policy" => {
                let policy = get_first_string_arg(child).unwrap_or_default();
                settings.cap_policy = match policy.as_str() {
                    "exact" => CapPolicy::Exact,
                    "at-least" => CapPolicy::AtLeast,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            field: "cap-policy".to_string(),
                            message: format!("unknown policy: {}", policy),
                        });
                    }
                };
            }
            "unique-names" => {
                settings.unique_names = get_first_bool_arg(child).unwrap_or(true);
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_credentials(node: &KdlNode, paths: &mut CredentialPaths) {
    let Some(children) = node.children() else {
        return;
    };

    for child in children.nodes() {
        let Some(value) = get_first_string_arg(child) else {
            continue;
        };
        match child.name().value() {
            "token-path" => paths.token_path = PathBuf::from(value),
            "ca-path" => paths.ca_path = PathBuf::from(value),
            "kubeconfig" => paths.kubeconfig = Some(PathBuf::from(value)),
            "in-cluster-host" => paths.in_cluster_host = value,
            _ => {}
        }
    }
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_first_integer_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

fn get_first_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}
