//! Push message payload.
//!
//! Shaped after the FCM HTTP v1 `Message` resource: a topic target, a display
//! notification, a string-only data map, and per-platform delivery hints.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::feed::FeedItem;

/// Action the mobile client routes a tapped notification to.
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// APNs category for breaking-news notifications.
pub const APNS_CATEGORY: &str = "BREAKING_NEWS";

/// A message published to every device subscribed to a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub topic: String,
    pub notification: Notification,
    pub data: BTreeMap<String, String>,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

/// Visible part of the notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub click_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub headers: BTreeMap<String, String>,
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    #[serde(rename = "content-available")]
    pub content_available: u8,
    #[serde(rename = "mutable-content")]
    pub mutable_content: u8,
    pub category: String,
}

impl PushMessage {
    /// Build the high-priority notification for a new video.
    pub fn for_video(topic: &str, video_id: &str, video: &FeedItem) -> Self {
        let data = BTreeMap::from([
            ("videoId".to_string(), video_id.to_string()),
            ("title".to_string(), video.title.clone()),
            ("image".to_string(), video.image.clone()),
            ("url".to_string(), video.url.clone()),
            ("source".to_string(), video.source.clone()),
            ("click_action".to_string(), CLICK_ACTION.to_string()),
        ]);

        Self {
            topic: topic.to_string(),
            notification: Notification {
                title: video.title.clone(),
                body: format!("New video from {}", video.source),
                image: video.image.clone(),
            },
            data,
            android: AndroidConfig {
                priority: "high".to_string(),
                notification: AndroidNotification {
                    click_action: CLICK_ACTION.to_string(),
                },
            },
            apns: ApnsConfig {
                headers: BTreeMap::from([("apns-priority".to_string(), "10".to_string())]),
                payload: ApnsPayload {
                    aps: Aps {
                        content_available: 1,
                        mutable_content: 1,
                        category: APNS_CATEGORY.to_string(),
                    },
                },
            },
        }
    }
}
