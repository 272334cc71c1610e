//! Notifier for newswire.
//!
//! After each cycle the most-viewed newly stored video is announced to a push
//! topic, unless it is the same video that was announced last.

mod fcm;
mod message;
mod state;

pub use fcm::FcmPushChannel;
pub use message::{
    AndroidConfig, AndroidNotification, ApnsConfig, ApnsPayload, Aps, Notification, PushMessage,
    APNS_CATEGORY, CLICK_ACTION,
};
pub use state::NotificationStateRepository;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::db::Database;
use crate::feed::{FeedItem, NotificationState};
use crate::{NewswireError, Result};

/// Delivery channel for push messages.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Publish a message to its topic.
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

#[async_trait]
impl<T: PushChannel + ?Sized> PushChannel for Box<T> {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        (**self).send(message).await
    }
}

/// What the notifier did in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No new videos this cycle.
    NoNewVideos,
    /// The top video was already announced.
    Suppressed { video_id: String },
    /// A notification was published.
    Sent { video_id: String },
}

impl std::fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyOutcome::NoNewVideos => write!(f, "no new videos"),
            NotifyOutcome::Suppressed { video_id } => write!(f, "suppressed ({})", video_id),
            NotifyOutcome::Sent { video_id } => write!(f, "sent ({})", video_id),
        }
    }
}

/// Select the video with the most views. Ties go to the earliest in the list.
///
/// Videos without a video id are never selected.
pub fn select_top(videos: &[FeedItem]) -> Option<(&str, &FeedItem)> {
    videos
        .iter()
        .filter_map(|v| {
            v.video_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|id| (id, v))
        })
        .fold(None, |best, candidate| match best {
            Some((_, b)) if b.view_count() >= candidate.1.view_count() => best,
            _ => Some(candidate),
        })
}

/// Announces new videos over a push channel.
pub struct Notifier<C: PushChannel> {
    channel: C,
    db: Database,
    topic: String,
}

impl<C: PushChannel> Notifier<C> {
    /// Create a new notifier publishing to `topic`.
    pub fn new(channel: C, db: Database, topic: impl Into<String>) -> Self {
        Self {
            channel,
            db,
            topic: topic.into(),
        }
    }

    /// Notify about the top video among this cycle's new videos.
    ///
    /// The stored state is only updated after a successful send, so a
    /// failed send leaves it untouched.
    pub async fn notify(&self, new_videos: &[FeedItem]) -> Result<NotifyOutcome> {
        let Some((video_id, video)) = select_top(new_videos) else {
            return Ok(NotifyOutcome::NoNewVideos);
        };

        let repo = NotificationStateRepository::new(&self.db);
        if let Some(last) = repo.get().await? {
            if last.video_id == video_id {
                info!("Video {} was already announced, skipping", video_id);
                return Ok(NotifyOutcome::Suppressed {
                    video_id: video_id.to_string(),
                });
            }
        }

        let message = PushMessage::for_video(&self.topic, video_id, video);
        if let Err(e) = self.channel.send(&message).await {
            warn!("Failed to notify about video {}: {}", video_id, e);
            return Err(match e {
                NewswireError::Notify(_) => e,
                other => NewswireError::Notify(other.to_string()),
            });
        }

        repo.set(&NotificationState {
            video_id: video_id.to_string(),
            title: video.title.clone(),
            notified_at: Utc::now(),
        })
        .await?;

        info!("Notified topic {} about video {}", self.topic, video_id);
        Ok(NotifyOutcome::Sent {
            video_id: video_id.to_string(),
        })
    }
}
