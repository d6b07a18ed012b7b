//! Slack client errors

use thiserror::Error;

/// Errors that can occur when posting to a Slack webhook
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request/response error (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with a non-200 status
    #[error("Slack API error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No webhook URL configured
    #[error("Slack notifier is not enabled")]
    Disabled,
}
