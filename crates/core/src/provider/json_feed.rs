//! Provider reading a JSON catalogue over HTTP.
//!
//! The feed is a JSON array of items:
//!
//! ```json
//! [{"id": "123", "show": "Les Lapins Crétins", "title": "Le grand saut",
//!   "pitch": "...", "season": 1, "episode": 2,
//!   "aired_at": "2024-03-02T08:30:00Z", "url": "https://.../123.m3u8"}]
//! ```
//!
//! Items without `url` may carry a `detail_url` answering `{"url": "..."}`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ConfigError;

use super::{MatchRequest, Provider, ResolutionError, ScanContext, ScanError, Show, ShowSink};

pub const NAME: &str = "jsonfeed";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
struct FeedItem {
    id: String,
    show: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    pitch: String,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    episode: Option<u32>,
    #[serde(default)]
    aired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    detail_url: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

impl FeedItem {
    fn into_show(self) -> Show {
        Show {
            id: self.id,
            provider: NAME.to_string(),
            show: self.show,
            title: self.title,
            pitch: self.pitch,
            season: self.season,
            episode: self.episode,
            aired_at: self.aired_at,
            stream_url: self.url,
            detail_url: self.detail_url,
            channel: self.channel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    url: Option<String>,
}

#[derive(Debug, Clone)]
struct FeedSettings {
    url: Option<String>,
    timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Generic provider for sources publishing their catalogue as JSON.
///
/// Settings: `url` (required), `timeout_secs` (optional, default 30).
pub struct JsonFeedProvider {
    client: Client,
    settings: RwLock<FeedSettings>,
    debug: AtomicBool,
}

impl Default for JsonFeedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFeedProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            settings: RwLock::new(FeedSettings::default()),
            debug: AtomicBool::new(false),
        }
    }

    fn settings(&self) -> FeedSettings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    async fn fetch_feed(&self, url: &str, timeout: Duration) -> Result<Vec<FeedItem>, ScanError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScanError::Timeout
                } else if e.is_connect() {
                    ScanError::ConnectionFailed(e.to_string())
                } else {
                    ScanError::ApiError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::ApiError(e.to_string()))?;
        parse_feed(&body)
    }

    async fn fetch_detail(&self, url: &str, timeout: Duration) -> Result<Option<String>, ResolutionError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ResolutionError::ProviderFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ResolutionError::ProviderFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let detail: DetailResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::ProviderFailed(format!("Failed to parse response: {}", e)))?;
        Ok(detail.url.filter(|u| !u.is_empty()))
    }
}

fn parse_feed(body: &str) -> Result<Vec<FeedItem>, ScanError> {
    serde_json::from_str(body).map_err(|e| ScanError::ParseError(e.to_string()))
}

#[async_trait]
impl Provider for JsonFeedProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn shows(
        &self,
        ctx: &ScanContext,
        requests: &[MatchRequest],
        sink: ShowSink,
    ) -> Result<(), ScanError> {
        let settings = self.settings();
        let url = settings
            .url
            .ok_or_else(|| ScanError::NotConfigured("missing 'url' setting".to_string()))?;

        let items = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ScanError::Cancelled),
            items = self.fetch_feed(&url, settings.timeout) => items?,
        };
        info!(provider = NAME, items = items.len(), "Feed downloaded");

        for item in items {
            if ctx.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            let show = item.into_show();
            if !requests.iter().any(|request| request.matches(&show)) {
                if self.debug.load(Ordering::Relaxed) {
                    debug!(provider = NAME, show = %show, "Skipping show not in watch list");
                }
                continue;
            }
            sink.send(show).await?;
        }
        Ok(())
    }

    async fn show_stream_url(
        &self,
        ctx: &ScanContext,
        show: &Show,
    ) -> Result<String, ResolutionError> {
        if let Some(url) = show.stream_url.as_ref().filter(|u| !u.is_empty()) {
            return Ok(url.clone());
        }

        let detail_url = show
            .detail_url
            .as_ref()
            .ok_or_else(|| ResolutionError::Unavailable { id: show.id.clone() })?;

        let timeout = self.settings().timeout;
        let resolved = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ResolutionError::Cancelled),
            resolved = self.fetch_detail(detail_url, timeout) => resolved?,
        };
        resolved.ok_or_else(|| ResolutionError::Unavailable { id: show.id.clone() })
    }

    fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    fn configure(&self, settings: &HashMap<String, String>) -> Result<(), ConfigError> {
        let mut parsed = FeedSettings::default();

        if let Some(url) = settings.get("url") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "{}: url must be http(s), got {:?}",
                    NAME, url
                )));
            }
            parsed.url = Some(url.clone());
        }

        if let Some(raw) = settings.get("timeout_secs") {
            let secs: u64 = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("{}: invalid timeout_secs {:?}", NAME, raw))
            })?;
            parsed.timeout = Duration::from_secs(secs);
        }

        let mut current = self
            .settings
            .write()
            .map_err(|_| ConfigError::ValidationError(format!("{}: settings lock poisoned", NAME)))?;
        *current = parsed;
        Ok(())
    }
}
