//! One aggregation cycle: fetch, merge, store, notify.

use futures::future::join_all;
use tracing::{debug, info};

use crate::config::{Config, StorePolicy};
use crate::db::Database;
use crate::feed::{merge, FeedItem, FeedStore, DEFAULT_RETENTION_CAP};
use crate::notify::{FcmPushChannel, Notifier, NotifyOutcome, PushChannel};
use crate::source::{
    ArticleSource, HtmlImageFetcher, ImageFetcher, RssArticleSource, VideoSource,
    YouTubeVideoSource,
};
use crate::Result;

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Articles fetched.
    pub articles: usize,
    /// Videos fetched.
    pub videos: usize,
    /// Videos not previously stored.
    pub new_videos: usize,
    /// Records written by the upsert.
    pub upserted: usize,
    /// Records evicted by retention.
    pub evicted: usize,
    /// Notifier outcome, `None` when notifications are disabled.
    pub notification: Option<NotifyOutcome>,
}

/// The aggregation pipeline and its collaborators.
pub struct Pipeline {
    db: Database,
    articles: Box<dyn ArticleSource>,
    videos: Box<dyn VideoSource>,
    images: Option<Box<dyn ImageFetcher>>,
    notifier: Option<Notifier<Box<dyn PushChannel>>>,
    retention_cap: usize,
    policy: StorePolicy,
}

impl Pipeline {
    /// Create a pipeline with no image fallback and no notifier.
    pub fn new(
        db: Database,
        articles: Box<dyn ArticleSource>,
        videos: Box<dyn VideoSource>,
    ) -> Self {
        Self {
            db,
            articles,
            videos,
            images: None,
            notifier: None,
            retention_cap: DEFAULT_RETENTION_CAP,
            policy: StorePolicy::default(),
        }
    }

    /// Build the production pipeline from configuration.
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let articles = RssArticleSource::new(&config.articles)?;
        let videos = YouTubeVideoSource::new(&config.videos)?;

        let mut pipeline = Self::new(db.clone(), Box::new(articles), Box::new(videos))
            .with_retention_cap(config.store.retention_cap)
            .with_policy(config.store.policy);

        if config.images.enabled {
            pipeline = pipeline.with_image_fetcher(Box::new(HtmlImageFetcher::new(&config.images)?));
        }
        if config.notify.enabled {
            let channel: Box<dyn PushChannel> = Box::new(FcmPushChannel::new(&config.notify)?);
            pipeline = pipeline.with_notifier(Notifier::new(channel, db, &config.notify.topic));
        }

        Ok(pipeline)
    }

    /// Set the image fallback for articles without a thumbnail.
    pub fn with_image_fetcher(mut self, images: Box<dyn ImageFetcher>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the notifier.
    pub fn with_notifier(mut self, notifier: Notifier<Box<dyn PushChannel>>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the maximum number of records kept after each cycle.
    pub fn with_retention_cap(mut self, retention_cap: usize) -> Self {
        self.retention_cap = retention_cap;
        self
    }

    /// Set the article write policy.
    pub fn with_policy(mut self, policy: StorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one cycle to completion.
    ///
    /// Store errors abort the cycle before notifying. A notification error is
    /// returned after the store writes have been committed.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        info!("Starting cycle");

        let (mut articles, videos) =
            tokio::join!(self.articles.fetch_articles(), self.videos.fetch_videos());
        self.fill_images(&mut articles).await;

        let article_count = articles.len();
        let video_count = videos.len();

        let store = FeedStore::new(&self.db);
        let existing = store.existing_fingerprints().await?;
        let merged = merge(articles, videos, &existing);
        debug!(
            "Merged {} item(s), {} new video(s)",
            merged.combined.len(),
            merged.new_videos.len()
        );

        if self.policy == StorePolicy::ReplaceArticles {
            store.purge_articles().await?;
        }
        let upserted = store.upsert(&merged.combined).await?;
        let evicted = store.enforce_retention(self.retention_cap).await?;

        let notification = match &self.notifier {
            Some(notifier) => {
                let outcome = notifier.notify(&merged.new_videos).await?;
                info!("Notification: {}", outcome);
                Some(outcome)
            }
            None => None,
        };

        let report = CycleReport {
            articles: article_count,
            videos: video_count,
            new_videos: merged.new_videos.len(),
            upserted,
            evicted,
            notification,
        };
        info!(
            "Cycle complete: {} article(s), {} video(s) ({} new), {} upserted, {} evicted",
            report.articles, report.videos, report.new_videos, report.upserted, report.evicted
        );
        Ok(report)
    }

    /// Look up thumbnails for articles that have none, concurrently.
    async fn fill_images(&self, articles: &mut [FeedItem]) {
        let Some(images) = &self.images else {
            return;
        };

        let pending: Vec<usize> = articles
            .iter()
            .enumerate()
            .filter(|(_, a)| a.image.is_empty() && !a.url.is_empty())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return;
        }

        let found = join_all(pending.iter().map(|&i| images.fetch_image(&articles[i].url))).await;

        let mut filled = 0;
        for (i, image) in pending.into_iter().zip(found) {
            if !image.is_empty() {
                articles[i].image = image;
                filled += 1;
            }
        }
        debug!("Found thumbnails for {} article(s)", filled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct Fixed(Vec<FeedItem>);

    #[async_trait]
    impl ArticleSource for Fixed {
        async fn fetch_articles(&self) -> Vec<FeedItem> {
            self.0.clone()
        }
    }

    #[async_trait]
    impl VideoSource for Fixed {
        async fn fetch_videos(&self) -> Vec<FeedItem> {
            self.0.clone()
        }
    }

    struct StaticImage;

    #[async_trait]
    impl ImageFetcher for StaticImage {
        async fn fetch_image(&self, url: &str) -> String {
            if url.contains("noimage") {
                String::new()
            } else {
                format!("{}/og.jpg", url)
            }
        }
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fill_images_only_when_missing() {
        let db = Database::open_in_memory().await.unwrap();
        let pipeline = Pipeline::new(db, Box::new(Fixed(vec![])), Box::new(Fixed(vec![])))
            .with_image_fetcher(Box::new(StaticImage));

        let mut articles = vec![
            FeedItem::article("A", "https://a.example", at(1)),
            FeedItem::article("B", "https://b.example", at(2)).with_image("https://cdn/b.jpg"),
            FeedItem::article("C", "https://noimage.example", at(3)),
        ];
        pipeline.fill_images(&mut articles).await;

        assert_eq!(articles[0].image, "https://a.example/og.jpg");
        assert_eq!(articles[1].image, "https://cdn/b.jpg");
        assert!(articles[2].image.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_without_notifier() {
        let db = Database::open_in_memory().await.unwrap();
        let articles = vec![FeedItem::article("A", "https://a.example", at(1))];
        let videos = vec![FeedItem::video("v1", "Clip", at(2), 3)];
        let pipeline = Pipeline::new(db.clone(), Box::new(Fixed(articles)), Box::new(Fixed(videos)));

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.articles, 1);
        assert_eq!(report.videos, 1);
        assert_eq!(report.new_videos, 1);
        assert_eq!(report.upserted, 2);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.notification, None);

        // Second run sees the video as already stored
        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.new_videos, 0);
        assert_eq!(report.upserted, 1);
        assert_eq!(FeedStore::new(&db).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cycle_enforces_retention() {
        let db = Database::open_in_memory().await.unwrap();
        let articles = (0..5)
            .map(|n| FeedItem::article(format!("A{n}"), format!("https://a/{n}"), at(n)))
            .collect();
        let pipeline = Pipeline::new(db.clone(), Box::new(Fixed(articles)), Box::new(Fixed(vec![])))
            .with_retention_cap(3);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.upserted, 5);
        assert_eq!(report.evicted, 2);

        let titles: Vec<String> = FeedStore::new(&db)
            .list(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.item.title)
            .collect();
        assert_eq!(titles, vec!["A4", "A3", "A2"]);
    }

    #[tokio::test]
    async fn test_replace_articles_policy() {
        let db = Database::open_in_memory().await.unwrap();
        let store = FeedStore::new(&db);
        store
            .upsert(&[
                FeedItem::article("Stale", "https://stale", at(1)),
                FeedItem::video("v0", "Old clip", at(1), 1),
            ])
            .await
            .unwrap();

        let articles = vec![FeedItem::article("Fresh", "https://fresh", at(2))];
        let pipeline = Pipeline::new(db.clone(), Box::new(Fixed(articles)), Box::new(Fixed(vec![])))
            .with_policy(StorePolicy::ReplaceArticles);
        pipeline.run_cycle().await.unwrap();

        let titles: Vec<String> = store
            .list(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.item.title)
            .collect();
        assert_eq!(titles, vec!["Fresh", "Old clip"]);
    }

    #[tokio::test]
    async fn test_from_config_defaults() {
        let db = Database::open_in_memory().await.unwrap();
        let pipeline = Pipeline::from_config(&Config::default(), db).unwrap();
        assert!(pipeline.images.is_some());
        assert!(pipeline.notifier.is_none());
        assert_eq!(pipeline.retention_cap, 30);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.upserted, 0);
    }
}
