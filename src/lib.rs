//! newswire - Breaking news aggregator
//!
//! Collects articles from RSS feeds and videos from a video platform into a
//! bounded, deduplicated, recency-ordered store, and pushes a notification
//! when a new top-viewed video appears.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod source;

pub use config::{Config, StorePolicy};
pub use db::Database;
pub use error::{NewswireError, Result};
pub use feed::{fingerprint, merge, FeedItem, FeedStore, ItemType, MergeResult, StoredRecord};
pub use notify::{Notifier, NotifyOutcome, PushChannel, PushMessage};
pub use pipeline::{CycleReport, Pipeline};
