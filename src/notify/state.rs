//! Persistence of the last notified video.

use chrono::Utc;
use tracing::debug;

use crate::datetime::{parse_datetime, to_db_timestamp};
use crate::db::Database;
use crate::feed::NotificationState;
use crate::Result;

/// Row type for the notification state singleton.
#[derive(Debug, Clone, sqlx::FromRow)]
struct NotificationStateRow {
    video_id: String,
    title: String,
    notified_at: String,
}

impl From<NotificationStateRow> for NotificationState {
    fn from(row: NotificationStateRow) -> Self {
        NotificationState {
            video_id: row.video_id,
            title: row.title,
            notified_at: parse_datetime(&row.notified_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for the singleton notification state row.
pub struct NotificationStateRepository<'a> {
    db: &'a Database,
}

impl<'a> NotificationStateRepository<'a> {
    /// Create a new repository.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get the last notification, if one was ever sent.
    pub async fn get(&self) -> Result<Option<NotificationState>> {
        let row = sqlx::query_as::<_, NotificationStateRow>(
            "SELECT video_id, title, notified_at FROM notification_state WHERE id = 1",
        )
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(NotificationState::from))
    }

    /// Replace the stored state.
    pub async fn set(&self, state: &NotificationState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_state (id, video_id, title, notified_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                video_id = excluded.video_id,
                title = excluded.title,
                notified_at = excluded.notified_at
            "#,
        )
        .bind(&state.video_id)
        .bind(&state.title)
        .bind(to_db_timestamp(&state.notified_at))
        .execute(self.db.pool())
        .await?;

        debug!("Recorded notification for video {}", state.video_id);
        Ok(())
    }
}
