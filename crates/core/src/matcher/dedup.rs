//! Deduplication of discovered shows by match key.

use std::collections::HashSet;

use crate::provider::Show;

use super::MatchKey;

/// Result of presenting a show to the [`Deduplicator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First time this episode is seen.
    Accepted(MatchKey),
    /// Same episode as something already accepted (this run or a prior one).
    Duplicate(MatchKey),
}

/// Set of episodes already handled. First seen wins.
///
/// Owned by a single merge stage, so it is not synchronised.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<MatchKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from keys recorded by a previous run.
    pub fn with_seen(keys: impl IntoIterator<Item = MatchKey>) -> Self {
        Self {
            seen: keys.into_iter().collect(),
        }
    }

    pub fn observe(&mut self, show: &Show) -> DedupOutcome {
        self.observe_key(show.match_key())
    }

    pub fn observe_key(&mut self, key: MatchKey) -> DedupOutcome {
        if self.seen.contains(&key) {
            DedupOutcome::Duplicate(key)
        } else {
            self.seen.insert(key.clone());
            DedupOutcome::Accepted(key)
        }
    }

    pub fn contains(&self, key: &MatchKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Keep the first show of every match key, preserving arrival order.
pub fn deduplicate_shows(shows: impl IntoIterator<Item = Show>) -> Vec<Show> {
    let mut dedup = Deduplicator::new();
    shows
        .into_iter()
        .filter(|show| matches!(dedup.observe(show), DedupOutcome::Accepted(_)))
        .collect()
}
