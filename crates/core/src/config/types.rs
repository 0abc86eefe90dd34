use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::orchestrator::ScanConfig;
use crate::provider::{Destinations, MatchRequest};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Verbose diagnostics for the whole run.
    #[serde(default)]
    pub debug: bool,
    /// Destination name -> output directory. `$VAR` / `${VAR}` are expanded.
    #[serde(default)]
    pub destinations: Destinations,
    /// Watch criteria, in priority order.
    #[serde(default)]
    pub watch_list: Vec<MatchRequest>,
    /// Per-provider sections.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

impl Config {
    /// A provider is active only when its section exists and is enabled.
    pub fn is_provider_active(&self, name: &str) -> bool {
        self.providers.get(name).map(|p| p.enabled).unwrap_or(false)
    }

    /// Names of the providers that are both enabled and referenced by the
    /// watch list, sorted.
    pub fn active_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .watch_list
            .iter()
            .map(|request| request.provider.clone())
            .filter(|name| self.is_provider_active(name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Starter configuration written by `--write-config`.
    pub fn starter() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            crate::provider::json_feed::NAME.to_string(),
            ProviderConfig {
                enabled: true,
                settings: HashMap::from([(
                    "url".to_string(),
                    "https://example.com/catalogue.json".to_string(),
                )]),
            },
        );

        Self {
            debug: false,
            destinations: HashMap::from([(
                "Jeunesse".to_string(),
                PathBuf::from("${HOME}/Videos/Jeunesse"),
            )]),
            watch_list: vec![MatchRequest::new(crate::provider::json_feed::NAME, "Jeunesse")
                .with_show("Les Lapins Crétins")],
            providers,
            scan: ScanConfig::default(),
            cache: None,
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

/// Provider section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Free-form settings handed to [`crate::provider::Provider::configure`].
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

/// Seen-episode cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub path: PathBuf,
}

/// External encoder configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FfmpegConfig {
    /// Explicit ffmpeg binary. Looked up on `PATH` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Sanitized config for logs (provider settings values hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub debug: bool,
    pub destinations: BTreeMap<String, PathBuf>,
    pub watch_list_len: usize,
    pub providers: BTreeMap<String, SanitizedProviderConfig>,
    pub scan: ScanConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub enabled: bool,
    pub setting_keys: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            debug: config.debug,
            destinations: config
                .destinations
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            watch_list_len: config.watch_list.len(),
            providers: config
                .providers
                .iter()
                .map(|(name, p)| {
                    let mut setting_keys: Vec<String> = p.settings.keys().cloned().collect();
                    setting_keys.sort();
                    (
                        name.clone(),
                        SanitizedProviderConfig {
                            enabled: p.enabled,
                            setting_keys,
                        },
                    )
                })
                .collect(),
            scan: config.scan.clone(),
            cache_path: config.cache.as_ref().map(|c| c.path.clone()),
        }
    }
}
