//! Trait for Slack webhook operations
//!
//! Allows the notifier to be exercised against a mock in unit tests.

use crate::error::SlackError;
use crate::models::SlackMessage;

#[async_trait::async_trait]
pub trait SlackClientTrait: Send + Sync {
    /// Posts one message to the webhook.
    async fn send(&self, message: &SlackMessage) -> Result<(), SlackError>;
}
