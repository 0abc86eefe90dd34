//! Seen store - episodes handled by previous runs.
//!
//! Keys are loaded into the deduplicator before a scan so an episode already
//! fetched is never accepted again, whichever provider offers it.

mod sqlite;

pub use sqlite::SqliteSeenStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::MatchKey;
use crate::provider::{CodecError, Show};

/// A recorded episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenEntry {
    pub match_key: MatchKey,
    pub show: Show,
    pub destination: String,
    pub first_seen_at: DateTime<Utc>,
}

/// Errors for seen store operations.
#[derive(Debug, Error)]
pub enum SeenStoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored show is corrupt: {0}")]
    Codec(#[from] CodecError),
}

/// Trait for seen-episode storage.
pub trait SeenStore: Send + Sync {
    /// Whether an episode with this key was recorded.
    fn contains(&self, key: &MatchKey) -> Result<bool, SeenStoreError>;

    /// Record a show under its match key.
    ///
    /// Returns false when the key was already recorded (the first entry wins).
    fn insert(&self, show: &Show, destination: &str) -> Result<bool, SeenStoreError>;

    /// Every recorded key.
    fn keys(&self) -> Result<Vec<MatchKey>, SeenStoreError>;

    /// Get the entry recorded under a key.
    fn get(&self, key: &MatchKey) -> Result<Option<SeenEntry>, SeenStoreError>;

    /// Number of recorded episodes.
    fn count(&self) -> Result<u64, SeenStoreError>;

    /// Forget everything.
    fn clear(&self) -> Result<(), SeenStoreError>;
}
