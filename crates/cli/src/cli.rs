use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aspiratv")]
#[command(about = "Scan replay providers and list the episodes to download")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to $ASPIRATV_CONFIG, then config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write a starter configuration to the config path and exit
    #[arg(long)]
    pub write_config: bool,

    /// Verbose diagnostics, also passed to every provider
    #[arg(short, long)]
    pub debug: bool,

    /// Only report matching shows: no resolution, nothing recorded as seen
    #[arg(long)]
    pub dry_run: bool,

    /// Write Prometheus metrics (text format) to this file after the run
    #[arg(long = "metrics-file")]
    pub metrics_file: Option<PathBuf>,
}

impl Cli {
    /// Config path from the flag, the environment, or the default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            std::env::var("ASPIRATV_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.toml"))
        })
    }
}
