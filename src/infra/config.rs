use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "boxctl.toml";
pub const DEFAULT_RUNTIME_BINARY: &str = "podman";
pub const DEFAULT_STOP_TIMEOUT: u64 = 10;

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/boxctl")
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path.to_path_buf(),
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker cap for bulk operations; unset or 0 picks a per-operation default.
    pub max_workers: Option<usize>,
    pub runtime_binary: Option<String>,
    pub detach_keys: Option<String>,
    /// Seconds to wait before killing a container on stop.
    pub stop_timeout: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: AppConfig) {
        if let Some(n) = other.engine.max_workers {
            self.engine.max_workers = Some(n);
        }
        if let Some(bin) = other.engine.runtime_binary {
            self.engine.runtime_binary = Some(bin);
        }
        if let Some(keys) = other.engine.detach_keys {
            self.engine.detach_keys = Some(keys);
        }
        if let Some(timeout) = other.engine.stop_timeout {
            self.engine.stop_timeout = Some(timeout);
        }
    }

    pub fn max_workers(&self) -> Option<usize> {
        self.engine.max_workers.filter(|n| *n > 0)
    }

    pub fn runtime_binary(&self) -> String {
        self.engine
            .runtime_binary
            .as_deref()
            .map(|bin| expand_path(Path::new(bin)).to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_RUNTIME_BINARY.to_string())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.stop_timeout.unwrap_or(DEFAULT_STOP_TIMEOUT))
    }
}

/// Loads `boxctl.toml` from `config_dir`, then lets a `boxctl.toml` in the
/// current directory override it. Missing files yield defaults.
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig> {
    load_app_config_from(config_dir, Path::new("./"))
}

/// Same as [`load_app_config`] with an explicit directory for the local
/// override file.
pub fn load_app_config_from(config_dir: &Path, local_dir: &Path) -> Result<AppConfig> {
    let mut app_config = read_config_file(&expand_path(config_dir).join(DEFAULT_CONFIG_NAME))?
        .unwrap_or_default();

    if let Some(local) = read_config_file(&local_dir.join(DEFAULT_CONFIG_NAME))? {
        app_config.merge(local);
    }

    Ok(app_config)
}

fn read_config_file(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        debug!("no config at {:?}", path);
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("reading config at {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("parsing config at {:?}", path))?;
    debug!("loaded config from {:?}", path);

    Ok(Some(config))
}
