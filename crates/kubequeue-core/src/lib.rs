//! Core domain types and traits for kubequeue.
//!
//! This crate contains:
//! - The error type shared by every other crate
//! - Label constants and selectors used to scope cluster queries
//! - The manifest normalizer
//! - Finished-resource predicates for jobs and pods
//! - Cluster and manifest-provider traits
//! - DNS-safe job name helpers
//! - An in-memory fake cluster for tests (`testing` feature)

pub mod cluster;
pub mod error;
pub mod labels;
pub mod manifest;
pub mod naming;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cluster::{ApiScope, ClusterConnector, JobApi, ManifestProvider, PodApi};
pub use error::{Error, Result};
pub use labels::LabelSelector;
pub use resource::{ObjectRef, PodPhase, ResourceKind};

pub use k8s_openapi::api::batch::v1::Job;
pub use k8s_openapi::api::core::v1::Pod;
