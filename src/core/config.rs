//! Runtime configuration.
//!
//! Resolved in layers: built-in defaults, then `ops.toml` in the working
//! directory, then `OPS_*` environment variables, then command-line flags.

use crate::core::error::OpsError;
use crate::core::schemas::{CONFIG_FILE_NAME, DATA_FILE_NAME, DEFAULT_DATA_DIR};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DATA_PATH: &str = "OPS_DATA_PATH";
pub const ENV_LOCK_TIMEOUT_MS: &str = "OPS_LOCK_TIMEOUT_MS";
pub const ENV_JOURNAL: &str = "OPS_JOURNAL";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_STALE_LOCK_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsConfig {
    pub data_path: PathBuf,
    pub lock_timeout_ms: u64,
    pub stale_lock_secs: u64,
    pub journal: bool,
}

/// Shape of `ops.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_path: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
    stale_lock_secs: Option<u64>,
    journal: Option<bool>,
}

impl OpsConfig {
    pub fn defaults(cwd: &Path) -> Self {
        Self {
            data_path: cwd.join(DEFAULT_DATA_DIR).join(DATA_FILE_NAME),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            stale_lock_secs: DEFAULT_STALE_LOCK_SECS,
            journal: true,
        }
    }

    /// Load the full layered configuration for a process running in `cwd`.
    pub fn load(cwd: &Path, data_override: Option<&Path>) -> Result<Self, OpsError> {
        let file = load_config_file(cwd)?;
        let mut config =
            Self::resolve(cwd, file.as_deref(), |key| std::env::var(key).ok())?;
        if let Some(path) = data_override {
            config.data_path = absolutize(cwd, path);
        }
        Ok(config)
    }

    /// Apply the file and environment layers over the defaults.
    pub fn resolve(
        cwd: &Path,
        file_contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, OpsError> {
        let mut config = Self::defaults(cwd);

        if let Some(contents) = file_contents {
            let file: ConfigFile = toml::from_str(contents)
                .map_err(|e| OpsError::ConfigError(format!("{}: {}", CONFIG_FILE_NAME, e)))?;
            if let Some(path) = file.data_path {
                config.data_path = absolutize(cwd, &path);
            }
            if let Some(ms) = file.lock_timeout_ms {
                config.lock_timeout_ms = ms;
            }
            if let Some(secs) = file.stale_lock_secs {
                config.stale_lock_secs = secs;
            }
            if let Some(journal) = file.journal {
                config.journal = journal;
            }
        }

        if let Some(path) = env(ENV_DATA_PATH).filter(|p| !p.trim().is_empty()) {
            config.data_path = absolutize(cwd, Path::new(&path));
        }
        if let Some(raw) = env(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout_ms = raw.trim().parse().map_err(|_| {
                OpsError::ConfigError(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    ENV_LOCK_TIMEOUT_MS, raw
                ))
            })?;
        }
        if let Some(raw) = env(ENV_JOURNAL) {
            config.journal = parse_flag(&raw).ok_or_else(|| {
                OpsError::ConfigError(format!("{} must be on/off, got '{}'", ENV_JOURNAL, raw))
            })?;
        }

        // Locks must outlive the longest wait for them.
        if config.stale_lock_secs.saturating_mul(1000) <= config.lock_timeout_ms {
            return Err(OpsError::ConfigError(format!(
                "stale_lock_secs ({}s) must exceed the lock timeout ({}ms)",
                config.stale_lock_secs, config.lock_timeout_ms
            )));
        }

        Ok(config)
    }
}

fn load_config_file(cwd: &Path) -> Result<Option<String>, OpsError> {
    let path = cwd.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    tracing::debug!(path = %path.display(), "reading config file");
    Ok(Some(fs::read_to_string(&path)?))
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
