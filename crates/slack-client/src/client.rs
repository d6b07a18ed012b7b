//! Slack incoming-webhook client

use crate::error::SlackError;
use crate::models::SlackMessage;
use crate::slack_trait::SlackClientTrait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack webhook client
///
/// The webhook URL embeds its credential, so it is never logged.
pub struct SlackClient {
    client: Client,
    webhook_url: String,
}

impl SlackClient {
    /// Create a new Slack client
    ///
    /// # Arguments
    /// * `webhook_url` - Incoming webhook URL; empty means notifications are disabled
    /// * `timeout` - Bound on each POST, including connect
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self, SlackError> {
        if webhook_url.trim().is_empty() {
            return Err(SlackError::Disabled);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    async fn post(&self, message: &SlackMessage) -> Result<(), SlackError> {
        let payload = serde_json::to_vec(message)?;
        debug!(bytes = payload.len(), "Posting Slack message");

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl SlackClientTrait for SlackClient {
    async fn send(&self, message: &SlackMessage) -> Result<(), SlackError> {
        self.post(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one request with the given status line and returns the
    /// request body it received.
    async fn one_shot_server(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/services/T000/B000/XXX", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                status_line
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_empty_webhook_is_disabled() {
        let result = SlackClient::new("  ".to_string(), DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(SlackError::Disabled)));
    }

    #[tokio::test]
    async fn test_send_posts_json_payload() {
        let (url, server) = one_shot_server("200 OK").await;
        let client = SlackClient::new(url, DEFAULT_TIMEOUT).unwrap();

        client
            .send(&SlackMessage::text("hello from the cluster"))
            .await
            .unwrap();

        let body = server.await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["text"], "hello from the cluster");
    }

    #[tokio::test]
    async fn test_non_200_status_is_an_api_error() {
        let (url, server) = one_shot_server("500 Internal Server Error").await;
        let client = SlackClient::new(url, DEFAULT_TIMEOUT).unwrap();

        let err = client.send(&SlackMessage::text("hi")).await.unwrap_err();
        server.await.unwrap();

        match err {
            SlackError::Api { status, .. } => assert_eq!(status, 500),
            other => panic!("expected API error, got {:?}", other),
        }
    }
}
