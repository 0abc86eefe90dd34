pub mod config;
pub mod matcher;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod seen;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ProviderConfig,
    SanitizedConfig,
};
pub use matcher::{route, DedupOutcome, Deduplicator, EpisodeNumber, MatchKey};
pub use orchestrator::{AcceptedShow, DownloadTarget, OrchestratorError, ScanConfig, ScanOrchestrator, ScanReport};
pub use provider::{
    Destinations, MatchRequest, Provider, ProviderRegistry, ResolutionError, ScanContext,
    ScanError, Show, ShowSink,
};
pub use seen::{SeenStore, SeenStoreError, SqliteSeenStore};
