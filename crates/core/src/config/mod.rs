mod loader;
mod types;
mod validate;

pub use loader::{expand_env, load_config, load_config_from_str, write_default_config};
pub use types::*;
pub use validate::{validate_config, validate_watch_list};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Destination {destination:?} for show {show:?} is not defined in [destinations]")]
    UnknownDestination { destination: String, show: String },

    #[error("Provider {0:?} referenced in the watch list is not registered")]
    UnknownProvider(String),
}
