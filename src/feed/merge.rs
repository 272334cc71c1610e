//! Merging of fetched articles and videos into one recency-ordered batch.

use std::collections::HashSet;

use tracing::warn;

use super::fingerprint::fingerprint;
use super::types::FeedItem;

/// Output of [`merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    /// Articles and new videos, newest first.
    pub combined: Vec<FeedItem>,
    /// Videos not already in the store, in fetch order.
    pub new_videos: Vec<FeedItem>,
}

/// Merge fetched items against the fingerprints already stored.
///
/// Only videos are filtered against `existing`; articles are always passed
/// through and rely on the store's idempotent upsert. `new_videos` therefore
/// contains exactly the videos first seen this cycle, which is what the
/// notifier selects from. A video repeated within the same fetch is kept once.
///
/// `combined` is stable-sorted by timestamp descending, so items with equal
/// timestamps keep their input order (articles before videos).
///
/// Items without a video id, url or title are dropped.
pub fn merge(
    articles: Vec<FeedItem>,
    videos: Vec<FeedItem>,
    existing: &HashSet<String>,
) -> MergeResult {
    let mut seen_videos = HashSet::new();
    let mut new_videos = Vec::new();

    for video in videos {
        let fp = match fingerprint(&video) {
            Ok(fp) => fp,
            Err(e) => {
                warn!("Dropping video without identity: {}", e);
                continue;
            }
        };
        if existing.contains(&fp) || !seen_videos.insert(fp) {
            continue;
        }
        new_videos.push(video);
    }

    let mut combined: Vec<FeedItem> = articles
        .into_iter()
        .filter(|article| {
            let keep = article.discriminator().is_some();
            if !keep {
                warn!("Dropping article without url or title");
            }
            keep
        })
        .collect();
    combined.extend(new_videos.iter().cloned());
    combined.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    MergeResult {
        combined,
        new_videos,
    }
}
