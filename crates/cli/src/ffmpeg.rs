//! Locating the ffmpeg binary used by downloads.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use tokio::process::Command;

static VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ffmpeg version (\S+)").unwrap());

#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("ffmpeg not found on PATH")]
    NotOnPath,

    #[error("ffmpeg not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("Cannot read ffmpeg version from {0:?}")]
    UnknownVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A usable ffmpeg installation.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    pub path: PathBuf,
    pub version: String,
}

/// Use the configured binary, or look one up on `PATH`, and read its version.
pub async fn locate(configured: Option<&Path>) -> Result<Ffmpeg, FfmpegError> {
    let path = match configured {
        Some(path) => path.to_path_buf(),
        None => lookup_on_path().await?,
    };

    let output = Command::new(&path)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FfmpegError::NotFound { path: path.clone() },
            _ => FfmpegError::Io(e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_version(&stdout)
        .ok_or_else(|| FfmpegError::UnknownVersion(stdout.lines().next().unwrap_or("").to_string()))?;

    Ok(Ffmpeg { path, version })
}

async fn lookup_on_path() -> Result<PathBuf, FfmpegError> {
    let finder = if cfg!(windows) { "where" } else { "which" };

    let output = match Command::new(finder)
        .arg("ffmpeg")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(FfmpegError::NotOnPath),
        Err(e) => return Err(FfmpegError::Io(e)),
    };

    if !output.status.success() {
        return Err(FfmpegError::NotOnPath);
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
        .ok_or(FfmpegError::NotOnPath)
}

/// Version string from the first line of `ffmpeg -version`.
pub fn parse_version(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    VERSION_LINE
        .captures(first.trim())
        .map(|caps| caps[1].to_string())
}
