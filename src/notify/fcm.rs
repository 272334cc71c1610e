//! Firebase Cloud Messaging (HTTP v1) push channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::{PushChannel, PushMessage};
use crate::config::NotifyConfig;
use crate::source::USER_AGENT;
use crate::{NewswireError, Result};

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a PushMessage,
}

/// Publishes messages through the FCM `messages:send` endpoint.
pub struct FcmPushChannel {
    client: Client,
    send_url: String,
    access_token: String,
}

impl FcmPushChannel {
    /// Create a new channel from configuration.
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewswireError::Notify(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            send_url: send_url(&config.endpoint, &config.project_id),
            access_token: config.access_token.clone(),
        })
    }
}

/// Build the `messages:send` URL for a project.
fn send_url(endpoint: &str, project_id: &str) -> String {
    format!(
        "{}/projects/{}/messages:send",
        endpoint.trim_end_matches('/'),
        project_id
    )
}

#[async_trait]
impl PushChannel for FcmPushChannel {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        debug!("Publishing push message to topic {}", message.topic);

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&SendRequest { message })
            .send()
            .await
            .map_err(|e| NewswireError::Notify(format!("push request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewswireError::Notify(format!(
                "push endpoint returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        info!("Push message published to topic {}", message.topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_url() {
        assert_eq!(
            send_url("https://fcm.googleapis.com/v1", "my-app"),
            "https://fcm.googleapis.com/v1/projects/my-app/messages:send"
        );
        assert_eq!(
            send_url("https://fcm.googleapis.com/v1/", "my-app"),
            "https://fcm.googleapis.com/v1/projects/my-app/messages:send"
        );
    }

    #[test]
    fn test_request_wraps_message() {
        let item = crate::feed::FeedItem::video("v1", "Clip", chrono::Utc::now(), 1);
        let message = PushMessage::for_video("breaking_news", "v1", &item);
        let json = serde_json::to_value(SendRequest { message: &message }).unwrap();
        assert_eq!(json["message"]["topic"], "breaking_news");
        assert_eq!(json["message"]["data"]["videoId"], "v1");
    }

    #[test]
    fn test_new_from_config() {
        let config = NotifyConfig {
            enabled: true,
            project_id: "my-app".to_string(),
            access_token: "token".to_string(),
            ..NotifyConfig::default()
        };
        let channel = FcmPushChannel::new(&config).unwrap();
        assert_eq!(
            channel.send_url,
            "https://fcm.googleapis.com/v1/projects/my-app/messages:send"
        );
    }
}
