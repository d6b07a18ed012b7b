//! Slack Webhook Client
//!
//! Posts attachment-style messages to a Slack incoming webhook.
//!
//! # Example
//!
//! ```no_run
//! use slack_client::{Attachment, SlackClient, SlackClientTrait, SlackMessage, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SlackClient::new(
//!     "https://hooks.slack.com/services/T000/B000/XXX".to_string(),
//!     DEFAULT_TIMEOUT,
//! )?;
//!
//! let message = SlackMessage::text("Deployment rolled out").with_attachment(Attachment {
//!     color: "good".to_string(),
//!     ..Default::default()
//! });
//! client.send(&message).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod slack_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{SlackClient, DEFAULT_TIMEOUT};
pub use error::SlackError;
pub use models::*;
pub use slack_trait::SlackClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockSlackClient;
