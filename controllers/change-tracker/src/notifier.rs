//! Slack notification sink.
//!
//! Only MODIFIED and DELETED events are announced. Delivery runs on its own
//! task so a slow or unreachable webhook never holds up a watch loop;
//! failures are logged and dropped.

use crate::error::ControllerError;
use event_store::{Action, ChangeEvent};
use slack_client::{
    Attachment, Block, Field, SlackClient, SlackClientTrait, SlackError, SlackMessage, TextObject,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Diff text longer than this many characters is cut in the message body
const DIFF_LIMIT: usize = 500;

/// Best-effort Slack notifier.
#[derive(Clone, Default)]
pub struct Notifier {
    client: Option<Arc<dyn SlackClientTrait>>,
}

impl Notifier {
    /// A notifier that sends nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(client: Arc<dyn SlackClientTrait>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Builds a webhook-backed notifier, or a disabled one when `webhook_url`
    /// is unset or blank.
    pub fn from_webhook(
        webhook_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ControllerError> {
        match webhook_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => {
                let client = SlackClient::new(url.to_string(), timeout)?;
                Ok(Self::new(Arc::new(client)))
            }
            None => Ok(Self::disabled()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    /// ADDED events are recorded but never announced.
    pub fn should_notify(action: Action) -> bool {
        matches!(action, Action::Modified | Action::Deleted)
    }

    /// Sends `event` and waits for the webhook response.
    ///
    /// Returns `Ok(())` without sending for actions that are not announced.
    pub async fn notify(&self, event: &ChangeEvent) -> Result<(), SlackError> {
        let client = self.client.as_ref().ok_or(SlackError::Disabled)?;
        if !Self::should_notify(event.action) {
            return Ok(());
        }
        client.send(&render(event)).await
    }

    /// Schedules delivery of `event` on a separate task.
    ///
    /// Returns the task handle when something was scheduled.
    pub fn dispatch(&self, event: &ChangeEvent) -> Option<JoinHandle<()>> {
        if !self.enabled() || !Self::should_notify(event.action) {
            return None;
        }

        let notifier = self.clone();
        let event = event.clone();
        Some(tokio::spawn(async move {
            match notifier.notify(&event).await {
                Ok(()) => debug!(
                    kind = %event.kind,
                    namespace = %event.namespace,
                    name = %event.name,
                    "Sent Slack notification"
                ),
                Err(e) => warn!(
                    kind = %event.kind,
                    namespace = %event.namespace,
                    name = %event.name,
                    "Failed to send Slack notification: {}", e
                ),
            }
        }))
    }

    /// Posts a one-off message confirming the webhook works.
    pub async fn test_connection(&self) -> Result<(), SlackError> {
        let client = self.client.as_ref().ok_or(SlackError::Disabled)?;
        let mut message = SlackMessage::text("🎉 Change Tracker notifications are now active!");
        message.blocks.push(Block {
            block_type: "section".to_string(),
            text: Some(TextObject {
                text_type: "mrkdwn".to_string(),
                text: "*Change Tracker* is connected. You will be notified when tracked resources are modified or deleted.".to_string(),
            }),
        });
        let message = message.with_attachment(Attachment {
            color: "good".to_string(),
            title: "Connection test".to_string(),
            ..Default::default()
        });
        client.send(&message).await?;
        info!("Slack connectivity test succeeded");
        Ok(())
    }
}

fn color(action: Action) -> &'static str {
    match action {
        Action::Added => "good",
        Action::Deleted => "danger",
        Action::Modified => "warning",
    }
}

fn emoji(kind: &str) -> &'static str {
    match kind {
        "Deployment" => "🚀",
        "ConfigMap" => "📝",
        "Secret" => "🔐",
        "Service" => "🌐",
        "Ingress" => "🚪",
        "StatefulSet" => "💾",
        "DaemonSet" => "👹",
        "CronJob" => "⏰",
        "Job" => "⚙️",
        _ => "📦",
    }
}

/// Cuts `diff` to [`DIFF_LIMIT`] characters, appending a truncation marker.
fn truncate_diff(diff: &str) -> String {
    match diff.char_indices().nth(DIFF_LIMIT) {
        Some((cut, _)) => format!("{}...\n_(truncated)_", &diff[..cut]),
        None => diff.to_string(),
    }
}

/// Renders the Slack message for one event.
pub fn render(event: &ChangeEvent) -> SlackMessage {
    let mut fields = vec![
        Field::new("Resource", format!("`{}/{}`", event.namespace, event.name), true),
        Field::new("Action", event.action.as_str(), true),
    ];

    if let (Some(before), Some(after)) = (&event.image_before, &event.image_after) {
        if before != after {
            fields.push(Field::new(
                "Image Change",
                format!("From: `{}`\nTo: `{}`", before, after),
                false,
            ));
        }
    }

    let text = if event.diff.is_empty() {
        String::new()
    } else {
        format!("```\n{}\n```", truncate_diff(&event.diff))
    };

    SlackMessage::default().with_attachment(Attachment {
        color: color(event.action).to_string(),
        title: format!(
            "{} {} {} in {}",
            emoji(&event.kind),
            event.kind,
            event.action,
            event.namespace
        ),
        text,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slack_client::MockSlackClient;

    fn modified(kind: &str, diff: &str) -> ChangeEvent {
        ChangeEvent::new(kind, "prod", "web", Action::Modified).with_diff(diff)
    }

    #[test]
    fn test_render_modified_deployment() {
        let mut event = modified("Deployment", "Image updated: nginx:1.25 → nginx:1.26");
        event.image_before = Some("nginx:1.25".to_string());
        event.image_after = Some("nginx:1.26".to_string());

        let message = render(&event);
        let attachment = &message.attachments[0];

        assert_eq!(attachment.color, "warning");
        assert_eq!(attachment.title, "🚀 Deployment MODIFIED in prod");
        assert_eq!(
            attachment.text,
            "```\nImage updated: nginx:1.25 → nginx:1.26\n```"
        );
        assert_eq!(attachment.fields[0].value, "`prod/web`");
        assert_eq!(attachment.fields[1].value, "MODIFIED");
        assert_eq!(attachment.fields[2].title, "Image Change");
        assert_eq!(attachment.fields[2].value, "From: `nginx:1.25`\nTo: `nginx:1.26`");
    }

    #[test]
    fn test_unchanged_image_has_no_image_field() {
        let mut event = ChangeEvent::new("StatefulSet", "data", "pg", Action::Deleted)
            .with_diff("StatefulSet deleted");
        event.image_before = Some("postgres:16".to_string());
        event.image_after = Some("postgres:16".to_string());

        let message = render(&event);
        let attachment = &message.attachments[0];

        assert_eq!(attachment.color, "danger");
        assert_eq!(attachment.title, "💾 StatefulSet DELETED in data");
        assert_eq!(attachment.fields.len(), 2);
    }

    #[test]
    fn test_long_diff_is_truncated_on_char_boundary() {
        let diff = "é".repeat(DIFF_LIMIT + 20);
        let message = render(&modified("ConfigMap", &diff));
        let text = &message.attachments[0].text;

        assert!(text.ends_with("...\n_(truncated)_\n```"));
        assert_eq!(text.matches('é').count(), DIFF_LIMIT);

        let short = render(&modified("ConfigMap", "Keys added: a"));
        assert!(!short.attachments[0].text.contains("truncated"));
    }

    #[test]
    fn test_unknown_kind_uses_default_emoji() {
        let message = render(&modified("Widget", "x"));
        assert_eq!(message.attachments[0].title, "📦 Widget MODIFIED in prod");
    }

    #[tokio::test]
    async fn test_added_events_are_not_sent() {
        let mock = MockSlackClient::new();
        let notifier = Notifier::new(Arc::new(mock.clone()));

        let added = ChangeEvent::new("Deployment", "prod", "web", Action::Added);
        assert!(notifier.dispatch(&added).is_none());
        notifier.notify(&added).await.unwrap();
        assert!(mock.sent().is_empty());

        let handle = notifier.dispatch(&modified("Deployment", "Scaled up: 1 → 2 replicas"));
        handle.unwrap().await.unwrap();
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_contained() {
        let mock = MockSlackClient::new();
        mock.fail_with_status(500);
        let notifier = Notifier::new(Arc::new(mock.clone()));

        let event = modified("Service", "Service configuration changed:");
        assert!(matches!(
            notifier.notify(&event).await,
            Err(SlackError::Api { status: 500, .. })
        ));
        notifier.dispatch(&event).unwrap().await.unwrap();
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_notifier() {
        let notifier = Notifier::from_webhook(Some("  "), Duration::from_secs(1)).unwrap();
        assert!(!notifier.enabled());
        assert!(notifier.dispatch(&modified("Job", "x")).is_none());
        assert!(matches!(
            notifier.test_connection().await,
            Err(SlackError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_connection_message() {
        let mock = MockSlackClient::new();
        let notifier = Notifier::new(Arc::new(mock.clone()));

        notifier.test_connection().await.unwrap();

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("🎉"));
        assert_eq!(sent[0].blocks[0].block_type, "section");
        assert_eq!(sent[0].attachments[0].color, "good");
    }
}
