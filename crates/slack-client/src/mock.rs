//! Mock SlackClient for unit testing
//!
//! Records every message it is asked to send and can be switched into a
//! failing mode to exercise error paths.

use crate::error::SlackError;
use crate::models::SlackMessage;
use crate::slack_trait::SlackClientTrait;
use std::sync::{Arc, Mutex};

/// Mock SlackClient for testing
#[derive(Clone, Default)]
pub struct MockSlackClient {
    sent: Arc<Mutex<Vec<SlackMessage>>>,
    fail_status: Arc<Mutex<Option<u16>>>,
}

impl MockSlackClient {
    /// Create a new mock client that accepts every message
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with the given HTTP status
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    /// Messages accepted so far, in send order
    pub fn sent(&self) -> Vec<SlackMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SlackClientTrait for MockSlackClient {
    async fn send(&self, message: &SlackMessage) -> Result<(), SlackError> {
        if let Some(status) = *self.fail_status.lock().unwrap() {
            return Err(SlackError::Api {
                status,
                body: "mock failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
