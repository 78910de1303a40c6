//! KDL configuration parsing for kubequeue.
//!
//! This crate handles parsing of:
//! - Settings (max workers, active environments, admission policy)
//! - Credential paths for the cluster client resolver
//! - Job manifest files

pub mod error;
pub mod manifest;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use manifest::FileManifest;
pub use system::{CapPolicy, CredentialPaths, Settings};
