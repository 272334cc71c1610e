//! Video source backed by the YouTube Data API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::http::build_client;
use super::VideoSource;
use crate::config::VideosConfig;
use crate::datetime::parse_rfc3339;
use crate::feed::FeedItem;
use crate::{NewswireError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Response of the `search` endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: String,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

impl Thumbnails {
    /// Best available thumbnail URL: high, then medium, then default.
    pub fn best(&self) -> Option<&str> {
        [&self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.as_str())
            .find(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Response of the `videos` endpoint with `part=statistics`.
#[derive(Debug, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub items: Vec<VideoStatsItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoStatsItem {
    pub id: String,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// The API encodes counts as decimal strings.
    #[serde(default)]
    pub view_count: Option<String>,
}

impl VideosResponse {
    /// Map video id to view count. Missing or malformed counts are omitted.
    pub fn view_counts(&self) -> HashMap<String, u64> {
        self.items
            .iter()
            .filter_map(|item| {
                let views = item
                    .statistics
                    .as_ref()?
                    .view_count
                    .as_ref()?
                    .parse()
                    .ok()?;
                Some((item.id.clone(), views))
            })
            .collect()
    }
}

/// Normalize search results into video items.
///
/// Results without a video id or with an unparseable publication time are
/// dropped. Videos missing from `views` count as zero views.
pub fn normalize_videos(search: SearchResponse, views: &HashMap<String, u64>) -> Vec<FeedItem> {
    search
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id.filter(|id| !id.is_empty())?;
            let timestamp = match parse_rfc3339(&item.snippet.published_at) {
                Some(ts) => ts,
                None => {
                    debug!("Dropping video {} with bad publishedAt", video_id);
                    return None;
                }
            };
            let view_count = views.get(&video_id).copied().unwrap_or(0);
            let image = item.snippet.thumbnails.best().unwrap_or_default().to_string();

            Some(
                FeedItem::video(video_id, item.snippet.title, timestamp, view_count)
                    .with_description(item.snippet.description)
                    .with_image(image)
                    .with_source(item.snippet.channel_title.unwrap_or_default()),
            )
        })
        .collect()
}

/// Fetches the latest uploads of each configured channel.
pub struct YouTubeVideoSource {
    client: Client,
    api_base: String,
    api_key: String,
    channel_ids: Vec<String>,
    max_results: u32,
}

impl YouTubeVideoSource {
    /// Create a new source from configuration.
    pub fn new(config: &VideosConfig) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(config.timeout_secs),
            0,
        )?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            channel_ids: config.channel_ids.clone(),
            max_results: config.max_results_per_channel,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| NewswireError::Fetch(format!("{} request failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            return Err(NewswireError::Fetch(format!(
                "{} returned HTTP {}",
                endpoint,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NewswireError::Fetch(format!("malformed {} response: {}", endpoint, e)))
    }

    /// Fetch the most recent uploads of one channel with their view counts.
    pub async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<FeedItem>> {
        let max_results = self.max_results.to_string();
        let search: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        let ids: Vec<&str> = search
            .items
            .iter()
            .filter_map(|item| item.id.video_id.as_deref())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.join(",");
        let views = match self
            .get_json::<VideosResponse>("videos", &[("part", "statistics"), ("id", ids.as_str())])
            .await
        {
            Ok(stats) => stats.view_counts(),
            Err(e) => {
                warn!("View counts unavailable for channel {}: {}", channel_id, e);
                HashMap::new()
            }
        };

        Ok(normalize_videos(search, &views))
    }
}

#[async_trait]
impl VideoSource for YouTubeVideoSource {
    async fn fetch_videos(&self) -> Vec<FeedItem> {
        let results = join_all(self.channel_ids.iter().map(|id| self.fetch_channel(id))).await;

        let mut videos = Vec::new();
        for (channel_id, result) in self.channel_ids.iter().zip(results) {
            match result {
                Ok(items) => videos.extend(items),
                Err(e) => warn!("Failed to fetch channel {}: {}", channel_id, e),
            }
        }

        info!(
            "Fetched {} video(s) from {} channel(s)",
            videos.len(),
            self.channel_ids.len()
        );
        videos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SEARCH_JSON: &str = r#"{
      "kind": "youtube#searchListResponse",
      "items": [
        {
          "id": {"kind": "youtube#video", "videoId": "aaa111"},
          "snippet": {
            "publishedAt": "2024-06-01T12:00:00Z",
            "channelId": "UC1",
            "title": "Live: storm update",
            "description": "Coverage",
            "thumbnails": {
              "default": {"url": "https://i.ytimg.com/vi/aaa111/default.jpg"},
              "high": {"url": "https://i.ytimg.com/vi/aaa111/hqdefault.jpg"}
            },
            "channelTitle": "News Channel"
          }
        },
        {
          "id": {"kind": "youtube#video", "videoId": "bbb222"},
          "snippet": {
            "publishedAt": "2024-06-01T10:00:00Z",
            "title": "Morning brief",
            "thumbnails": {
              "medium": {"url": "https://i.ytimg.com/vi/bbb222/mqdefault.jpg"}
            }
          }
        },
        {
          "id": {"kind": "youtube#playlist"},
          "snippet": {"publishedAt": "2024-06-01T09:00:00Z", "title": "Playlist"}
        },
        {
          "id": {"kind": "youtube#video", "videoId": "ccc333"},
          "snippet": {"publishedAt": "yesterday", "title": "Broken date"}
        }
      ]
    }"#;

    const VIDEOS_JSON: &str = r#"{
      "items": [
        {"id": "aaa111", "statistics": {"viewCount": "1500", "likeCount": "20"}},
        {"id": "bbb222", "statistics": {"viewCount": "not-a-number"}}
      ]
    }"#;

    #[test]
    fn test_view_counts() {
        let stats: VideosResponse = serde_json::from_str(VIDEOS_JSON).unwrap();
        let views = stats.view_counts();
        assert_eq!(views.get("aaa111"), Some(&1500));
        assert_eq!(views.get("bbb222"), None);
    }

    #[test]
    fn test_normalize_videos() {
        let search: SearchResponse = serde_json::from_str(SEARCH_JSON).unwrap();
        let stats: VideosResponse = serde_json::from_str(VIDEOS_JSON).unwrap();

        let videos = normalize_videos(search, &stats.view_counts());
        assert_eq!(videos.len(), 2);

        let first = &videos[0];
        assert_eq!(first.video_id.as_deref(), Some("aaa111"));
        assert_eq!(first.title, "Live: storm update");
        assert_eq!(first.url, "https://www.youtube.com/watch?v=aaa111");
        assert_eq!(first.image, "https://i.ytimg.com/vi/aaa111/hqdefault.jpg");
        assert_eq!(first.source, "News Channel");
        assert_eq!(first.views, Some(1500));
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        );

        let second = &videos[1];
        assert_eq!(second.image, "https://i.ytimg.com/vi/bbb222/mqdefault.jpg");
        assert_eq!(second.source, "Unknown");
        assert_eq!(second.views, Some(0));
    }

    #[test]
    fn test_thumbnails_best_empty() {
        assert_eq!(Thumbnails::default().best(), None);
    }

    #[test]
    fn test_search_response_without_items() {
        let search: SearchResponse = serde_json::from_str(r#"{"kind": "x"}"#).unwrap();
        assert!(normalize_videos(search, &HashMap::new()).is_empty());
    }

    #[test]
    fn test_new_source_trims_base() {
        let config = VideosConfig {
            api_base: "https://api.example.com/v3/".to_string(),
            ..VideosConfig::default()
        };
        let source = YouTubeVideoSource::new(&config).unwrap();
        assert_eq!(source.api_base, "https://api.example.com/v3");
        assert_eq!(source.max_results, 3);
    }

    #[tokio::test]
    async fn test_fetch_videos_no_channels() {
        let source = YouTubeVideoSource::new(&VideosConfig::default()).unwrap();
        assert!(source.fetch_videos().await.is_empty());
    }
}
