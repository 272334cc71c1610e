//! Bounded feed store.
//!
//! Records are keyed by fingerprint. Every write batch runs in one
//! transaction; a failure leaves the store at its previous state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use tracing::{debug, info, warn};

use super::fingerprint::fingerprint;
use super::types::{FeedItem, ItemType, StoredRecord};
use crate::datetime::{parse_datetime, to_db_timestamp};
use crate::db::Database;
use crate::Result;

/// Maximum number of bound parameters per DELETE statement.
const DELETE_CHUNK_SIZE: usize = 500;

/// Newest first. Rows whose `published_at` is not a stored timestamp rank last.
const RECENCY_ORDER: &str =
    "published_at GLOB '[0-9][0-9][0-9][0-9]-*' DESC, published_at DESC, fingerprint ASC";

/// Row type for a feed item from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedItemRow {
    fingerprint: String,
    item_type: String,
    title: String,
    description: String,
    url: String,
    image: String,
    source: String,
    published_at: String,
    video_id: Option<String>,
    views: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl From<FeedItemRow> for StoredRecord {
    fn from(row: FeedItemRow) -> Self {
        let item_type = ItemType::parse(&row.item_type).unwrap_or_else(|| {
            warn!(
                "Record {} has unknown item type {:?}, reading as article",
                row.fingerprint, row.item_type
            );
            ItemType::Article
        });

        StoredRecord {
            item: FeedItem {
                title: row.title,
                description: row.description,
                url: row.url,
                image: row.image,
                item_type,
                source: row.source,
                timestamp: stored_time(&row.fingerprint, "published_at", &row.published_at),
                video_id: row.video_id,
                views: row.views.map(|v| v.max(0) as u64),
            },
            created_at: stored_time(&row.fingerprint, "created_at", &row.created_at),
            updated_at: stored_time(&row.fingerprint, "updated_at", &row.updated_at),
            fingerprint: row.fingerprint,
        }
    }
}

/// Parse a stored timestamp. Unreadable values become the Unix epoch so the
/// record ranks oldest.
fn stored_time(fingerprint: &str, column: &str, value: &str) -> DateTime<Utc> {
    parse_datetime(value).unwrap_or_else(|| {
        warn!(
            "Record {} has unreadable {} {:?}, using the Unix epoch",
            fingerprint, column, value
        );
        DateTime::<Utc>::default()
    })
}

/// Persistent, bounded collection of feed items.
pub struct FeedStore<'a> {
    db: &'a Database,
}

impl<'a> FeedStore<'a> {
    /// Create a new store over the given database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load every stored fingerprint.
    ///
    /// This is a full scan. It is cheap at the default retention cap but
    /// grows linearly with the cap.
    pub async fn existing_fingerprints(&self) -> Result<HashSet<String>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT fingerprint FROM feed_items")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Create or merge a record for each item, in a single transaction.
    ///
    /// Existing records are updated in place. Fields missing from the new
    /// payload keep their stored values: an empty image, and a missing video
    /// id or view count. `created_at` is never overwritten.
    ///
    /// Returns the number of items written.
    pub async fn upsert(&self, items: &[FeedItem]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let now = to_db_timestamp(&Utc::now());
        let mut tx = self.db.begin().await?;

        for item in items {
            // An error here drops `tx`, rolling back the whole batch
            let fp = fingerprint(item)?;
            let views = item.views.map(|v| i64::try_from(v).unwrap_or(i64::MAX));

            sqlx::query(
                r#"
                INSERT INTO feed_items (fingerprint, item_type, title, description, url, image,
                                        source, published_at, video_id, views, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(fingerprint) DO UPDATE SET
                    item_type = excluded.item_type,
                    title = excluded.title,
                    description = excluded.description,
                    url = excluded.url,
                    image = CASE WHEN excluded.image = '' THEN feed_items.image ELSE excluded.image END,
                    source = excluded.source,
                    published_at = excluded.published_at,
                    video_id = COALESCE(excluded.video_id, feed_items.video_id),
                    views = COALESCE(excluded.views, feed_items.views),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&fp)
            .bind(item.item_type.as_str())
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.url)
            .bind(&item.image)
            .bind(&item.source)
            .bind(to_db_timestamp(&item.timestamp))
            .bind(&item.video_id)
            .bind(views)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Upserted {} item(s)", items.len());
        Ok(items.len())
    }

    /// Evict everything beyond the `max` most recent records.
    ///
    /// Records are ranked by publication time (newest first, ties broken by
    /// fingerprint). Records with an unreadable publication time rank last.
    /// The read and the deletes share one transaction.
    ///
    /// Returns the number of records evicted.
    pub async fn enforce_retention(&self, max: usize) -> Result<usize> {
        let mut tx = self.db.begin().await?;

        let ranked: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT fingerprint FROM feed_items ORDER BY {}",
            RECENCY_ORDER
        ))
        .fetch_all(&mut *tx)
        .await?;

        if ranked.len() <= max {
            tx.commit().await?;
            return Ok(0);
        }

        let overflow = &ranked[max..];
        for chunk in overflow.chunks(DELETE_CHUNK_SIZE) {
            let mut query: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("DELETE FROM feed_items WHERE fingerprint IN (");
            let mut separated = query.separated(", ");
            for fp in chunk {
                separated.push_bind(fp);
            }
            separated.push_unseparated(")");
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            "Evicted {} record(s) beyond retention cap of {}",
            overflow.len(),
            max
        );
        Ok(overflow.len())
    }

    /// Delete every stored article in its own transaction.
    ///
    /// Used by the replace-articles policy before the cycle's upsert.
    pub async fn purge_articles(&self) -> Result<usize> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM feed_items WHERE item_type = ?")
            .bind(ItemType::Article.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Purged {} article(s)", result.rows_affected());
        Ok(result.rows_affected() as usize)
    }

    /// List stored records, newest first.
    pub async fn list(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query_as::<_, FeedItemRow>(&format!(
            "SELECT fingerprint, item_type, title, description, url, image, source,
                    published_at, video_id, views, created_at, updated_at
             FROM feed_items
             ORDER BY {}
             LIMIT ?",
            RECENCY_ORDER
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }

    /// Get a record by fingerprint.
    pub async fn get(&self, fingerprint: &str) -> Result<Option<StoredRecord>> {
        let row = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT fingerprint, item_type, title, description, url, image, source,
                   published_at, video_id, views, created_at, updated_at
            FROM feed_items
            WHERE fingerprint = ?
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(StoredRecord::from))
    }

    /// Count stored records.
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_items")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count as usize)
    }
}
