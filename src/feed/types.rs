//! Feed types for newswire.

use chrono::{DateTime, Utc};

/// Maximum length for an item description.
pub const MAX_DESCRIPTION_LENGTH: usize = 10000;

/// Default number of records kept after each cycle.
pub const DEFAULT_RETENTION_CAP: usize = 30;

/// Publisher name used when a source does not provide one.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Kind of item in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// An article from an RSS feed.
    Article,
    /// A video from the video platform.
    Video,
}

impl ItemType {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Article => "article",
            ItemType::Video => "video",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "article" => Some(ItemType::Article),
            "video" => Some(ItemType::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized article or video.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Headline.
    pub title: String,
    /// Summary text (HTML stripped).
    pub description: String,
    /// Link to the article or video page.
    pub url: String,
    /// Thumbnail URL, empty when none is known.
    pub image: String,
    /// Article or video.
    pub item_type: ItemType,
    /// Publisher or channel name.
    pub source: String,
    /// Publication time.
    pub timestamp: DateTime<Utc>,
    /// Platform video id (videos only).
    pub video_id: Option<String>,
    /// View count (videos only).
    pub views: Option<u64>,
}

impl FeedItem {
    /// Create a new article.
    pub fn article(
        title: impl Into<String>,
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            url: url.into(),
            image: String::new(),
            item_type: ItemType::Article,
            source: UNKNOWN_SOURCE.to_string(),
            timestamp,
            video_id: None,
            views: None,
        }
    }

    /// Create a new video.
    pub fn video(
        video_id: impl Into<String>,
        title: impl Into<String>,
        timestamp: DateTime<Utc>,
        views: u64,
    ) -> Self {
        let video_id = video_id.into();
        Self {
            title: title.into(),
            description: String::new(),
            url: watch_url(&video_id),
            image: String::new(),
            item_type: ItemType::Video,
            source: UNKNOWN_SOURCE.to_string(),
            timestamp,
            video_id: Some(video_id),
            views: Some(views),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let desc = description.into();
        if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
            self.description = desc.chars().take(MAX_DESCRIPTION_LENGTH).collect();
        } else {
            self.description = desc;
        }
        self
    }

    /// Set the image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the source name. Empty names fall back to "Unknown".
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = if source.trim().is_empty() {
            UNKNOWN_SOURCE.to_string()
        } else {
            source
        };
        self
    }

    /// Set the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Check whether this item is a video.
    pub fn is_video(&self) -> bool {
        self.item_type == ItemType::Video
    }

    /// View count, zero for articles.
    pub fn view_count(&self) -> u64 {
        self.views.unwrap_or(0)
    }

    /// First non-empty value among video id, url and title.
    ///
    /// This is the value the fingerprint is derived from.
    pub fn discriminator(&self) -> Option<&str> {
        self.video_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.url.as_str()).filter(|s| !s.is_empty()))
            .or_else(|| Some(self.title.as_str()).filter(|s| !s.is_empty()))
    }
}

/// Public watch page for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// A feed item as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Primary key.
    pub fingerprint: String,
    /// Stored item.
    pub item: FeedItem,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// The last video a push notification was sent for.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationState {
    /// Video id.
    pub video_id: String,
    /// Video title at the time of sending.
    pub title: String,
    /// When the notification was sent.
    pub notified_at: DateTime<Utc>,
}
