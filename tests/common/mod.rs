//! Test helpers for pipeline integration tests.
//!
//! Provides fixed in-memory sources and a recording push channel.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use newswire::notify::{Notifier, PushChannel, PushMessage};
use newswire::source::{ArticleSource, VideoSource};
use newswire::{Database, FeedItem, NewswireError, Pipeline, Result};

/// Fixed reference time for deterministic timestamps.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// `now()` shifted by the given number of seconds.
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    now() + Duration::seconds(offset_secs)
}

/// Article source returning a fixed list.
pub struct FixedArticles(pub Vec<FeedItem>);

#[async_trait]
impl ArticleSource for FixedArticles {
    async fn fetch_articles(&self) -> Vec<FeedItem> {
        self.0.clone()
    }
}

/// Video source returning a fixed list.
pub struct FixedVideos(pub Vec<FeedItem>);

#[async_trait]
impl VideoSource for FixedVideos {
    async fn fetch_videos(&self) -> Vec<FeedItem> {
        self.0.clone()
    }
}

/// Push channel that records sent messages, or fails every send.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    pub sent: Arc<Mutex<Vec<PushMessage>>>,
    pub fail: bool,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.data["videoId"].clone())
            .collect()
    }
}

#[async_trait]
impl PushChannel for RecordingChannel {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        if self.fail {
            return Err(NewswireError::Notify("HTTP 503".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Build a pipeline over fixed sources with a recording notifier.
pub fn pipeline(
    db: &Database,
    articles: Vec<FeedItem>,
    videos: Vec<FeedItem>,
    channel: &RecordingChannel,
) -> Pipeline {
    let channel: Box<dyn PushChannel> = Box::new(channel.clone());
    Pipeline::new(
        db.clone(),
        Box::new(FixedArticles(articles)),
        Box::new(FixedVideos(videos)),
    )
    .with_notifier(Notifier::new(channel, db.clone(), "breaking_news"))
}
