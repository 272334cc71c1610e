//! Feed core for newswire.
//!
//! Fingerprinting, merging of fetched items, and the bounded feed store.

pub mod fingerprint;
pub mod merge;
pub mod store;
pub mod types;

pub use fingerprint::fingerprint;
pub use merge::{merge, MergeResult};
pub use store::FeedStore;
pub use types::{
    watch_url, FeedItem, ItemType, NotificationState, StoredRecord, DEFAULT_RETENTION_CAP,
    MAX_DESCRIPTION_LENGTH, UNKNOWN_SOURCE,
};
