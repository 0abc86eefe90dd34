use crate::provider::{Destinations, MatchRequest, ProviderRegistry};

use super::{types::Config, ConfigError};

/// Validate configuration against the registered providers.
/// Currently validates:
/// - every watch-list entry targets a defined destination
/// - every watch-list entry names a registered provider
/// - scan queue capacity is not 0
pub fn validate_config(config: &Config, registry: &ProviderRegistry) -> Result<(), ConfigError> {
    if config.scan.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "scan.queue_capacity cannot be 0".to_string(),
        ));
    }

    if config.destinations.keys().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "destination names cannot be empty".to_string(),
        ));
    }

    validate_watch_list(&config.watch_list, &config.destinations, registry)
}

/// Check that every watch-list entry can be routed and scanned.
pub fn validate_watch_list(
    watch_list: &[MatchRequest],
    destinations: &Destinations,
    registry: &ProviderRegistry,
) -> Result<(), ConfigError> {
    for request in watch_list {
        if !destinations.contains_key(&request.destination) {
            return Err(ConfigError::UnknownDestination {
                destination: request.destination.clone(),
                show: request.show.clone(),
            });
        }
        if !registry.contains(&request.provider) {
            return Err(ConfigError::UnknownProvider(request.provider.clone()));
        }
    }
    Ok(())
}
