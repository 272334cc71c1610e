//! Source adapters for newswire.
//!
//! Adapters fetch remote content and normalize it into [`FeedItem`]s. They
//! isolate their own failures: a feed, channel or page that cannot be fetched
//! is logged and contributes nothing, so callers never see an error.

pub mod html;
pub mod http;
pub mod image;
pub mod rss;
pub mod youtube;

use async_trait::async_trait;

use crate::feed::FeedItem;

pub use html::{extract_meta_image, strip_html};
pub use http::{build_client, validate_url, USER_AGENT};
pub use image::HtmlImageFetcher;
pub use rss::{parse_feed, select_recent, RssArticleSource};
pub use youtube::{normalize_videos, YouTubeVideoSource};

/// Source of news articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch the most recent articles across all configured feeds, newest first.
    async fn fetch_articles(&self) -> Vec<FeedItem>;
}

/// Source of videos.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch the latest uploads of all configured channels.
    async fn fetch_videos(&self) -> Vec<FeedItem>;
}

/// Best-effort thumbnail lookup for an article page.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Return a thumbnail URL for the page, or an empty string.
    async fn fetch_image(&self, url: &str) -> String;
}
