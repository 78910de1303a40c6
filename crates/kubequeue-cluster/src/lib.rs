//! Kubernetes cluster client for kubequeue.
//!
//! Provides:
//! - Credential resolution (in-cluster service account, then operator kubeconfig)
//! - kube-rs backed implementations of the core job and pod traits

pub mod kubernetes;
pub mod resolver;

pub use kubernetes::{KubeConnector, KubeJobs, KubePods};
pub use resolver::{ClientResolver, CredentialSource};
