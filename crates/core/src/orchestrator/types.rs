//! Types for the scan orchestrator.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::matcher::MatchKey;
use crate::provider::{naming, Show};

/// Errors that abort a whole scan before any provider runs.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Watch list or destination table is inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A show that passed matching and deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedShow {
    pub show: Show,
    /// Destination name from the routing watch-list entry.
    pub destination: String,
    /// Directory the destination name resolves to.
    pub destination_path: PathBuf,
    pub match_key: MatchKey,
}

/// What the downstream downloader needs for one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTarget {
    pub url: String,
    pub destination_path: PathBuf,
    pub file_name: String,
    /// Pattern matching any file of the same show in the destination.
    pub file_name_matcher: String,
    pub provider: String,
    pub show_id: String,
}

impl DownloadTarget {
    pub fn output_path(&self) -> PathBuf {
        self.destination_path.join(&self.file_name)
    }

    /// Whether the exact output file is already present.
    pub fn already_downloaded(&self) -> bool {
        self.output_path().exists()
    }

    /// Files of the same show already in the destination, including the
    /// exact output file when present.
    pub fn existing_show_files(&self) -> io::Result<Vec<PathBuf>> {
        naming::find_matching_files(&self.destination_path, &self.file_name_matcher)
    }
}

/// Outcome of a scan run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Accepted shows in arrival order.
    pub accepted: Vec<AcceptedShow>,
    /// Shows dropped because their episode was already accepted or seen.
    pub duplicates: usize,
    /// Shows that matched no watch-list entry.
    pub unmatched: usize,
    /// Shows received per provider (including dropped ones).
    pub shows_per_provider: HashMap<String, usize>,
    /// Providers whose scan ended with an error (name -> error message).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub provider_errors: HashMap<String, String>,
    /// Whether the scan context was cancelled (timeout or caller).
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn accepted_from(&self, provider: &str) -> impl Iterator<Item = &AcceptedShow> {
        let provider = provider.to_string();
        self.accepted
            .iter()
            .filter(move |accepted| accepted.show.provider == provider)
    }
}
