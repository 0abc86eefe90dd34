use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("ASPIRATV_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(normalize(config))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    Ok(normalize(config))
}

/// Write the starter configuration. Refuses to overwrite an existing file.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::WriteError(format!(
            "{} already exists",
            path.display()
        )));
    }
    let body = toml::to_string_pretty(&Config::starter())
        .map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, body).map_err(|e| ConfigError::WriteError(e.to_string()))
}

/// Expand `$VAR` and `${VAR}` from the process environment. Unset variables
/// expand to the empty string.
pub fn expand_env(value: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

// Runs once per load: watch-list filters are lower-cased and destination
// paths expanded here, never during a scan.
fn normalize(mut config: Config) -> Config {
    for path in config.destinations.values_mut() {
        *path = PathBuf::from(expand_env(&path.to_string_lossy()));
    }
    if let Some(cache) = config.cache.as_mut() {
        cache.path = PathBuf::from(expand_env(&cache.path.to_string_lossy()));
    }
    config.watch_list = config
        .watch_list
        .into_iter()
        .map(|request| request.normalized())
        .collect();
    config
}
