//! Error types for kubequeue.

use thiserror::Error;

use crate::resource::{ObjectRef, ResourceKind};

#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential source, or the client could not be built.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("failed to list {kind}s: {message}")]
    List { kind: ResourceKind, message: String },

    #[error("failed to delete {target}: {message}")]
    Delete { target: ObjectRef, message: String },

    #[error("failed to create job {namespace}/{name}: {message}")]
    Submission {
        name: String,
        namespace: String,
        message: String,
    },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
