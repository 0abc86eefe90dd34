//! The capability contract every content source implements.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::ConfigError;

use super::naming;
use super::{MatchRequest, ResolutionError, ScanContext, ScanError, Show, ShowSink};

/// A content source.
///
/// Implementations are shared between the registry and the scan workers, so
/// mutable state (settings, debug flag) lives behind interior mutability.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable unique name, used as the registry key.
    fn name(&self) -> &str;

    /// Scan the source and push every show matching one of `requests` into
    /// `sink` as it is found.
    ///
    /// Must return promptly once `ctx` is cancelled. Shows sent before an
    /// error are kept by the caller.
    async fn shows(
        &self,
        ctx: &ScanContext,
        requests: &[MatchRequest],
        sink: ShowSink,
    ) -> Result<(), ScanError>;

    /// Resolve a show to a fetchable stream location.
    async fn show_stream_url(&self, ctx: &ScanContext, show: &Show)
        -> Result<String, ResolutionError>;

    /// Filesystem-safe name of the final artifact for this episode.
    fn show_file_name(&self, show: &Show) -> String {
        naming::episode_file_name(show)
    }

    /// Coarse wildcard pattern, identical for every episode of a show, used
    /// to spot files of that show already present in a destination.
    fn show_file_name_matcher(&self, show: &Show) -> String {
        naming::series_file_name_matcher(show)
    }

    /// Toggle verbose diagnostics.
    fn set_debug(&self, debug: bool);

    /// Apply provider-specific settings from the configuration.
    fn configure(&self, _settings: &HashMap<String, String>) -> Result<(), ConfigError> {
        Ok(())
    }
}
