//! Configuration loading and parsing.
//!
//! Settings come from built-in defaults, then an optional TOML file, then command-line
//! overrides, in increasing priority.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use musicool_proto::MAX_CHUNK_SIZE;
use serde::Deserialize;

use crate::library::DEFAULT_EXTENSION;
use crate::stream::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_BIND: &str = "0.0.0.0:50051";
pub const DEFAULT_LIBRARY_ROOT: &str = "../Biblioteca";

/// Server configuration file (TOML). Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener address (host:port).
    pub bind: Option<String>,
    /// Root of the `<artist>/<album>/<title>.<ext>` tree.
    pub library_root: Option<String>,
    /// Chunk payload size in bytes.
    pub chunk_size: Option<usize>,
    /// Track file extension, without the dot.
    pub extension: Option<String>,
    /// Socket write timeout in milliseconds; unset blocks indefinitely.
    pub send_timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServerConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub bind: Option<SocketAddr>,
    pub library_root: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub extension: Option<String>,
}

/// Effective settings shared read-only by every connection.
#[derive(Debug, Clone)]
pub struct StreamerSettings {
    pub bind: SocketAddr,
    pub library_root: PathBuf,
    pub chunk_size: usize,
    pub extension: String,
    pub send_timeout: Option<Duration>,
}

impl StreamerSettings {
    /// Settings for serving `library_root` on `bind` with all other values at their defaults.
    pub fn new(bind: SocketAddr, library_root: impl Into<PathBuf>) -> Self {
        Self {
            bind,
            library_root: library_root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            extension: DEFAULT_EXTENSION.to_string(),
            send_timeout: None,
        }
    }
}

/// Merge defaults, `cfg` and `overrides`, then validate the result.
pub fn resolve_settings(cfg: &ServerConfig, overrides: &SettingsOverrides) -> Result<StreamerSettings> {
    let bind = match overrides.bind {
        Some(bind) => bind,
        None => {
            let raw = cfg.bind.as_deref().unwrap_or(DEFAULT_BIND);
            raw.parse().with_context(|| format!("parse bind {raw}"))?
        }
    };

    let library_root = overrides
        .library_root
        .clone()
        .or_else(|| cfg.library_root.as_deref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY_ROOT));

    let chunk_size = overrides
        .chunk_size
        .or(cfg.chunk_size)
        .unwrap_or(DEFAULT_CHUNK_SIZE);
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(anyhow::anyhow!(
            "chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {chunk_size}"
        ));
    }

    let raw_ext = overrides
        .extension
        .as_deref()
        .or(cfg.extension.as_deref())
        .unwrap_or(DEFAULT_EXTENSION);
    let extension = normalize_extension(raw_ext)
        .ok_or_else(|| anyhow::anyhow!("extension must not be empty"))?;

    Ok(StreamerSettings {
        bind,
        library_root,
        chunk_size,
        extension,
        send_timeout: cfg
            .send_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
    })
}

/// Config file next to the running executable, when one exists.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")))
        .filter(|path| path.is_file())
}

fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}
