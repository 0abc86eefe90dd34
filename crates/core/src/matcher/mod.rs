//! Show matching and deduplication.
//!
//! A show is routed to the first watch-list entry it satisfies, then checked
//! against the episodes already accepted using its [`MatchKey`].

mod dedup;
mod filter;
mod match_key;

pub use dedup::{deduplicate_shows, DedupOutcome, Deduplicator};
pub use filter::{requests_for, route, text_matches};
pub use match_key::{fold, parse_episode_number, EpisodeNumber, MatchKey};

pub(crate) use match_key::strip_episode_tokens;
