//! Types shared by every content provider.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::{self, EpisodeNumber, MatchKey};

/// Destination name -> output directory.
pub type Destinations = HashMap<String, PathBuf>;

/// A watch criterion declared in the configuration.
///
/// `show`, `title` and `pitch` are lower-cased once, when the configuration is
/// loaded (see [`MatchRequest::normalized`]). Empty filters are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Provider this criterion applies to.
    pub provider: String,
    /// Substring of the series name.
    #[serde(default)]
    pub show: String,
    /// Substring of the episode title.
    #[serde(default)]
    pub title: String,
    /// Substring of the episode description.
    #[serde(default)]
    pub pitch: String,
    /// Key into the destination table.
    pub destination: String,
}

impl MatchRequest {
    pub fn new(provider: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            show: String::new(),
            title: String::new(),
            pitch: String::new(),
            destination: destination.into(),
        }
    }

    pub fn with_show(mut self, show: impl Into<String>) -> Self {
        self.show = show.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_pitch(mut self, pitch: impl Into<String>) -> Self {
        self.pitch = pitch.into();
        self
    }

    /// Lower-case the text filters.
    pub fn normalized(mut self) -> Self {
        self.show = self.show.trim().to_lowercase();
        self.title = self.title.trim().to_lowercase();
        self.pitch = self.pitch.trim().to_lowercase();
        self
    }

    /// Whether every text filter is empty.
    pub fn is_wildcard(&self) -> bool {
        self.show.is_empty() && self.title.is_empty() && self.pitch.is_empty()
    }

    /// Whether `show` satisfies this criterion.
    pub fn matches(&self, show: &Show) -> bool {
        self.provider == show.provider
            && matcher::text_matches(&self.show, &show.show)
            && matcher::text_matches(&self.title, &show.title)
            && matcher::text_matches(&self.pitch, &show.pitch)
    }
}

/// An episode discovered by a provider.
///
/// Serialized as JSON for diagnostics and as a compact binary form for the
/// seen-store (see [`Show::to_bytes`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    /// Provider-assigned identity.
    pub id: String,
    /// Name of the provider that produced this show.
    pub provider: String,
    /// Series name.
    pub show: String,
    /// Episode title.
    #[serde(default)]
    pub title: String,
    /// Episode description.
    #[serde(default)]
    pub pitch: String,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub aired_at: Option<DateTime<Utc>>,
    /// Stream location when the provider already knows it.
    #[serde(default)]
    pub stream_url: Option<String>,
    /// Page or API endpoint the provider resolves the stream from.
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Show {
    pub fn new(
        provider: impl Into<String>,
        id: impl Into<String>,
        show: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            show: show.into(),
            title: title.into(),
            pitch: String::new(),
            season: None,
            episode: None,
            aired_at: None,
            stream_url: None,
            detail_url: None,
            channel: None,
        }
    }

    pub fn with_pitch(mut self, pitch: impl Into<String>) -> Self {
        self.pitch = pitch.into();
        self
    }

    pub fn with_episode(mut self, season: Option<u32>, episode: u32) -> Self {
        self.season = season;
        self.episode = Some(episode);
        self
    }

    pub fn with_aired_at(mut self, aired_at: DateTime<Utc>) -> Self {
        self.aired_at = Some(aired_at);
        self
    }

    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn with_detail_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = Some(url.into());
        self
    }

    /// Season/episode numbers, from the explicit fields or parsed from the
    /// title. The show name is only parsed when the title is empty, so a
    /// number that belongs to the series name ("4x4 Magazine") is not taken
    /// for an episode.
    pub fn episode_number(&self) -> Option<EpisodeNumber> {
        if let Some(episode) = self.episode {
            return Some(EpisodeNumber {
                season: self.season,
                episode,
            });
        }
        if let Some(number) = matcher::parse_episode_number(&self.title) {
            return Some(number);
        }
        if matcher::strip_episode_tokens(&matcher::fold(&self.title)).is_empty() {
            return matcher::parse_episode_number(&self.show);
        }
        None
    }

    /// Key used to detect the same episode across providers and naming styles.
    pub fn match_key(&self) -> MatchKey {
        MatchKey::for_show(self)
    }

    /// Encode to the compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError(e.to_string()))
    }

    /// Decode from the compact binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError(e.to_string()))
    }

    /// Encode a batch of shows (e.g. a whole scan) at once.
    pub fn encode_batch(shows: &[Show]) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(shows).map_err(|e| CodecError(e.to_string()))
    }

    pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Show>, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError(e.to_string()))
    }
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show)?;
        if let Some(number) = self.episode_number() {
            write!(f, " {}", number)?;
        }
        if !self.title.is_empty() {
            write!(f, " - {}", self.title)?;
        }
        Ok(())
    }
}

/// Binary encoding or decoding of a [`Show`] failed.
#[derive(Debug, Clone, Error)]
#[error("Show codec error: {0}")]
pub struct CodecError(pub String);

/// Errors that end one provider's scan. Other providers are not affected.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("Provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    #[error("Provider is not configured: {0}")]
    NotConfigured(String),

    #[error("Scan timed out")]
    Timeout,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A show could not be resolved to a stream location.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("Show {id} is no longer available")]
    Unavailable { id: String },

    #[error("Provider failed to resolve stream: {0}")]
    ProviderFailed(String),

    #[error("No provider registered under {0:?}")]
    UnknownProvider(String),

    #[error("Resolution cancelled")]
    Cancelled,
}
