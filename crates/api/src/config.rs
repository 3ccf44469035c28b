use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use satellite_core::runtime::RuntimeSettings;

/// Env var naming a YAML config file. When set, the file is the only source.
pub const CONFIG_PATH_ENV: &str = "SLATE_SATELLITE_CONFIG_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{key} must be a valid {expected}, got {value:?}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Satellite configuration.
///
/// YAML keys are camelCase; every key is optional and falls back to the same
/// default as the environment loader, except `enableDevelopment`, which is
/// off unless the file turns it on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatelliteConfig {
    /// Base URL of the core service (ResourceDB and human task system).
    #[serde(default = "default_core_url")]
    pub slate_core_url: String,
    #[serde(default)]
    pub enable_development: bool,
    #[serde(default = "default_scan_dirs")]
    pub resource_definition_scan_dirs: Vec<PathBuf>,
    #[serde(default = "default_scan_dirs")]
    pub task_definition_scan_dirs: Vec<PathBuf>,
    /// Handed to task handlers, and to resource handlers on initialization.
    #[serde(default = "default_task_config_dir")]
    pub task_config_dir: PathBuf,
    #[serde(default = "default_task_tmp_dir")]
    pub task_tmp_dir: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Backfill cursors older than this are recreated. Unset: never evict.
    #[serde(default)]
    pub backfill_cache_ttl_secs: Option<u64>,
}

/// A zero TTL would expire every cursor before its second page.
fn check_ttl(secs: Option<u64>) -> Result<(), ConfigError> {
    match secs {
        Some(0) => Err(ConfigError::InvalidValue {
            key: "BACKFILL_CACHE_TTL_SECS",
            expected: "positive number of seconds",
            value: "0".into(),
        }),
        _ => Ok(()),
    }
}

fn default_core_url() -> String {
    "http://localhost:8090".into()
}

fn default_scan_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_task_config_dir() -> PathBuf {
    PathBuf::from("/tmp/taskconfig")
}

fn default_task_tmp_dir() -> PathBuf {
    PathBuf::from("/tmp/tasktmp")
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

impl SatelliteConfig {
    /// Load from the file named by `SLATE_SATELLITE_CONFIG_PATH`, or from the
    /// environment when it is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        check_ttl(config.backfill_cache_ttl_secs)?;
        Ok(config)
    }

    /// Load configuration from environment variables with defaults.
    /// Development mode is always on.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `SLATE_CORE_URL`          | `http://localhost:8090` |
    /// | `RESOURCE_DEF_DIR`        | `.` (comma-separated)   |
    /// | `TASK_DEF_DIR`            | `.` (comma-separated)   |
    /// | `TASK_CONFIG_DIR`         | `/tmp/taskconfig`       |
    /// | `TASK_TMP_DIR`            | `/tmp/tasktmp`          |
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `5000`                  |
    /// | `BACKFILL_CACHE_TTL_SECS` | unset                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dirs = |key: &str| {
            get(key)
                .map(|raw| split_dirs(&raw))
                .unwrap_or_else(default_scan_dirs)
        };

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                expected: "u16",
                value: raw,
            })?,
            None => default_port(),
        };

        let backfill_cache_ttl_secs = get("BACKFILL_CACHE_TTL_SECS")
            .map(|raw| {
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BACKFILL_CACHE_TTL_SECS",
                    expected: "u64",
                    value: raw,
                })
            })
            .transpose()?;
        check_ttl(backfill_cache_ttl_secs)?;

        Ok(Self {
            slate_core_url: get("SLATE_CORE_URL").unwrap_or_else(default_core_url),
            enable_development: true,
            resource_definition_scan_dirs: dirs("RESOURCE_DEF_DIR"),
            task_definition_scan_dirs: dirs("TASK_DEF_DIR"),
            task_config_dir: get("TASK_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_task_config_dir),
            task_tmp_dir: get("TASK_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_task_tmp_dir),
            host: get("HOST").unwrap_or_else(default_host),
            port,
            backfill_cache_ttl_secs,
        })
    }

    pub fn backfill_ttl(&self) -> Option<Duration> {
        self.backfill_cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            development: self.enable_development,
            config_dir: self.task_config_dir.clone(),
            tmp_dir: self.task_tmp_dir.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_dirs(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
