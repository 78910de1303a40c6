//! Cluster client resolution.

use kube::config::{
    AuthInfo, Cluster, Context, KubeConfigOptions, Kubeconfig, NamedAuthInfo, NamedCluster,
    NamedContext,
};
use kube::{Client, Config};
use kubequeue_config::CredentialPaths;
use kubequeue_core::{ApiScope, Error, Result};
use std::path::PathBuf;
use tracing::debug;

const IN_CLUSTER_NAME: &str = "in-cluster";
const SERVICE_ACCOUNT_USER: &str = "service-account";

/// Where credentials were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account token and CA bundle mounted into the pod.
    InCluster,
    /// An operator kubeconfig file.
    Kubeconfig(PathBuf),
}

/// Builds cluster clients from local credential files.
#[derive(Debug, Clone)]
pub struct ClientResolver {
    paths: CredentialPaths,
}

impl ClientResolver {
    pub fn new(paths: CredentialPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &CredentialPaths {
        &self.paths
    }

    /// The first credential source present on disk.
    pub fn credential_source(&self) -> Option<CredentialSource> {
        if self.paths.token_path.is_file() && self.paths.ca_path.is_file() {
            return Some(CredentialSource::InCluster);
        }

        self.paths
            .kubeconfig
            .as_ref()
            .filter(|path| path.is_file())
            .map(|path| CredentialSource::Kubeconfig(path.clone()))
    }

    /// Build a client for `scope`, or `None` when no credentials exist.
    ///
    /// Both scopes get the same client. The API group path is chosen per
    /// request by the `Api<K>` built on top of it, so `scope` only labels
    /// the resolution in logs.
    pub async fn resolve(&self, scope: ApiScope) -> Result<Option<Client>> {
        let Some(source) = self.credential_source() else {
            debug!(%scope, "No cluster credentials found");
            return Ok(None);
        };

        let kubeconfig = match &source {
            CredentialSource::InCluster => self.in_cluster_kubeconfig(),
            CredentialSource::Kubeconfig(path) => Kubeconfig::read_from(path)
                .map_err(|e| Error::Connection(format!("{}: {}", path.display(), e)))?,
        };

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let client = Client::try_from(config).map_err(|e| Error::Connection(e.to_string()))?;

        debug!(%scope, ?source, "Resolved cluster client");
        Ok(Some(client))
    }

    /// A kubeconfig addressing the in-cluster API host with the mounted
    /// service account credentials. The token file is re-read by the client
    /// as it rotates.
    pub fn in_cluster_kubeconfig(&self) -> Kubeconfig {
        Kubeconfig {
            api_version: Some("v1".to_string()),
            kind: Some("Config".to_string()),
            clusters: vec![NamedCluster {
                name: IN_CLUSTER_NAME.to_string(),
                cluster: Some(Cluster {
                    server: Some(self.paths.in_cluster_host.clone()),
                    certificate_authority: Some(self.paths.ca_path.to_string_lossy().into_owned()),
                    ..Default::default()
                }),
            }],
            auth_infos: vec![NamedAuthInfo {
                name: SERVICE_ACCOUNT_USER.to_string(),
                auth_info: Some(AuthInfo {
                    token_file: Some(self.paths.token_path.to_string_lossy().into_owned()),
                    ..Default::default()
                }),
            }],
            contexts: vec![NamedContext {
                name: IN_CLUSTER_NAME.to_string(),
                context: Some(Context {
                    cluster: IN_CLUSTER_NAME.to_string().into(),
                    user: SERVICE_ACCOUNT_USER.to_string().into(),
                    ..Default::default()
                }),
            }],
            current_context: Some(IN_CLUSTER_NAME.to_string()),
            ..Default::default()
        }
    }
}
