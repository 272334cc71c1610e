//! Database schema and migrations for newswire.
//!
//! Migrations are applied sequentially when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version table
/// tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed items keyed by content fingerprint
    r#"
CREATE TABLE IF NOT EXISTS feed_items (
    fingerprint  TEXT PRIMARY KEY,
    item_type    TEXT NOT NULL CHECK (item_type IN ('article', 'video')),
    title        TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    url          TEXT NOT NULL DEFAULT '',
    image        TEXT NOT NULL DEFAULT '',
    source       TEXT NOT NULL DEFAULT 'Unknown',
    published_at TEXT NOT NULL,
    video_id     TEXT,
    views        INTEGER CHECK (views IS NULL OR views >= 0),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feed_items_published_at ON feed_items(published_at DESC);
CREATE INDEX IF NOT EXISTS idx_feed_items_type ON feed_items(item_type);
"#,
    // v2: Last video a push notification was sent for
    r#"
CREATE TABLE IF NOT EXISTS notification_state (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    video_id    TEXT NOT NULL,
    title       TEXT NOT NULL,
    notified_at TEXT NOT NULL
);
"#,
];
