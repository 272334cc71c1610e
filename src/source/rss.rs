//! RSS/Atom article source.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::html::strip_html;
use super::http::{build_client, validate_url};
use super::ArticleSource;
use crate::config::{ArticlesConfig, FeedSourceConfig};
use crate::feed::FeedItem;
use crate::{NewswireError, Result};

/// Fetches configured RSS/Atom feeds and normalizes their entries to articles.
pub struct RssArticleSource {
    client: Client,
    feeds: Vec<FeedSourceConfig>,
    max_articles: usize,
    max_feed_size: u64,
}

impl RssArticleSource {
    /// Create a new source from configuration.
    pub fn new(config: &ArticlesConfig) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.total_timeout_secs),
            config.max_redirects,
        )?;

        Ok(Self {
            client,
            feeds: config.feeds.clone(),
            max_articles: config.max_articles,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse a single feed.
    pub async fn fetch_feed(&self, feed: &FeedSourceConfig) -> Result<Vec<FeedItem>> {
        validate_url(&feed.url)?;

        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NewswireError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(NewswireError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(NewswireError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes, &feed.source)
    }
}

#[async_trait]
impl ArticleSource for RssArticleSource {
    async fn fetch_articles(&self) -> Vec<FeedItem> {
        let results = join_all(self.feeds.iter().map(|feed| self.fetch_feed(feed))).await;

        let mut articles = Vec::new();
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(items) => {
                    debug!("Feed {} returned {} article(s)", feed.url, items.len());
                    articles.extend(items);
                }
                Err(e) => warn!("Failed to fetch feed {}: {}", feed.url, e),
            }
        }

        let articles = select_recent(articles, self.max_articles);
        info!(
            "Fetched {} article(s) from {} feed(s)",
            articles.len(),
            self.feeds.len()
        );
        articles
    }
}

/// Keep the `max` most recent articles, newest first.
pub fn select_recent(mut articles: Vec<FeedItem>, max: usize) -> Vec<FeedItem> {
    articles.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    articles.truncate(max);
    articles
}

/// Parse feed bytes into articles attributed to `source`.
///
/// Entries without a publication time, or without both link and title, are
/// dropped.
pub fn parse_feed(bytes: &[u8], source: &str) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes)
        .map_err(|e| NewswireError::Fetch(format!("failed to parse feed: {}", e)))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| normalize_entry(entry, source))
        .collect())
}

fn normalize_entry(entry: Entry, source: &str) -> Option<FeedItem> {
    let timestamp = match entry.published.or(entry.updated) {
        Some(ts) => ts,
        None => {
            debug!("Dropping entry {} without a publication time", entry.id);
            return None;
        }
    };

    let image = entry_image(&entry).unwrap_or_default();
    let title = entry
        .title
        .map(|t| strip_html(&t.content))
        .unwrap_or_default();
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let description = entry
        .summary
        .map(|t| t.content)
        .or(entry.content.and_then(|c| c.body))
        .map(|d| strip_html(&d))
        .unwrap_or_default();

    let item = FeedItem::article(title, link, timestamp)
        .with_description(description)
        .with_image(image)
        .with_source(source);

    if item.discriminator().is_none() {
        debug!("Dropping entry {} without link or title", entry.id);
        return None;
    }
    Some(item)
}

/// Image from the entry's enclosure or `media:content`, then its thumbnail.
fn entry_image(entry: &Entry) -> Option<String> {
    let content_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|c| {
            c.content_type.as_ref().map_or(true, |ct| {
                ct.to_string().to_ascii_lowercase().starts_with("image/")
            })
        })
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

    content_url.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .find(|uri| !uri.is_empty())
    })
}
