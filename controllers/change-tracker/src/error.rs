//! Controller-specific error types.
//!
//! Only bootstrap failures (configuration, store open, cluster client) ever
//! surface out of `main`; errors inside the watch pipeline are logged where
//! they happen.

use event_store::StoreError;
use kube::Error as KubeError;
use slack_client::SlackError;
use thiserror::Error;

/// Errors that can occur in the Change Tracker.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Event store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Slack delivery error
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Background task panicked or was cancelled
    #[error("Task join failed: {0}")]
    Join(String),
}
