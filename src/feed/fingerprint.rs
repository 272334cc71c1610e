//! Content fingerprints used as the store key and deduplication key.

use sha2::{Digest, Sha256};

use super::types::FeedItem;
use crate::{NewswireError, Result};

/// Compute the fingerprint of an item.
///
/// The fingerprint is the hex SHA-256 digest of the first non-empty value
/// among the video id, url and title. Items refetched later yield the same
/// fingerprint as long as that value is unchanged.
pub fn fingerprint(item: &FeedItem) -> Result<String> {
    let key = item.discriminator().ok_or_else(|| {
        NewswireError::Validation("item has no video id, url or title".to_string())
    })?;
    Ok(digest(key))
}

fn digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
