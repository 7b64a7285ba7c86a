//! Controller-specific error types.
//!
//! This module defines the error kinds the controller can produce. Which of
//! them end the process is decided by the watch loop, not by the component
//! that raised the error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the ConfigMap sync controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configuration file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        /// Path passed on the command line
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the expected schema
    #[error("failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        /// Path passed on the command line
        path: PathBuf,
        /// The underlying deserialization error
        source: serde_yaml::Error,
    },

    /// Configuration parsed but is semantically unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubeconfig file could not be loaded
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource watch failed
    #[error("resource watch failed: {0}")]
    Watch(String),

    /// Filesystem registration or removal failed
    #[error("filestore error: {0}")]
    FileStore(#[from] filestore::FileStoreError),
}

impl ControllerError {
    /// Whether the watch loop should stop and let the process exit for this
    /// error.
    ///
    /// Verification failures and post-deploy failures never reach this point
    /// (the reconciler downgrades them to warnings where they occur), so
    /// everything that does bubble up here is a startup, cluster, or
    /// filesystem failure the process cannot recover from on its own.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidConfig(_)
            | Self::Kubeconfig(_)
            | Self::Kube(_)
            | Self::Watch(_)
            | Self::FileStore(_) => true,
        }
    }
}
