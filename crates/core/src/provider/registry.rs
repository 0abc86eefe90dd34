//! Name -> provider lookup, built once at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ConfigError, ProviderConfig};

use super::{JsonFeedProvider, Provider};

/// Registered providers, keyed by [`Provider::name`].
///
/// Populated single-threaded before any scan starts and only read afterwards,
/// so it is shared as a plain `Arc<ProviderRegistry>`.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every provider shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonFeedProvider::new()));
        registry
    }

    /// Add a provider. A provider already registered under the same name is
    /// replaced and returned.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        let name = provider.name().to_string();
        let previous = self.providers.insert(name.clone(), provider);
        if previous.is_some() {
            warn!(
                provider = %name,
                "Provider registered twice, the last registration replaces the previous one"
            );
        } else {
            debug!(provider = %name, "Provider registered");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Read-only view of the registry contents.
    pub fn list(&self) -> &HashMap<String, Arc<dyn Provider>> {
        &self.providers
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Hand each provider the settings of its configuration section.
    ///
    /// Sections naming an unregistered provider are reported and ignored;
    /// watch-list references to unknown providers are caught by validation.
    pub fn configure(&self, sections: &HashMap<String, ProviderConfig>) -> Result<(), ConfigError> {
        for (name, section) in sections {
            match self.providers.get(name) {
                Some(provider) => provider.configure(&section.settings)?,
                None => warn!(provider = %name, "Configuration section for unknown provider"),
            }
        }
        Ok(())
    }

    pub fn set_debug(&self, debug: bool) {
        for provider in self.providers.values() {
            provider.set_debug(debug);
        }
    }
}
