//! Bridge configuration.
//!
//! Resolved once, the first time the worker is created: defaults, then
//! `~/.tosync/config.toml` (or the file named by `TOSYNC_CONFIG`), then
//! environment overrides.
//!
//! ```toml
//! [worker]
//! thread_name = "tosync-worker"
//! stack_size = 4194304
//! mode = "production"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "TOSYNC_CONFIG";
pub const MODE_ENV: &str = "TOSYNC_ENV";
pub const THREAD_NAME_ENV: &str = "TOSYNC_WORKER_THREAD_NAME";
pub const STACK_SIZE_ENV: &str = "TOSYNC_WORKER_STACK_SIZE";

const DEFAULT_THREAD_NAME: &str = "tosync-worker";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bridge is already configured")]
    AlreadyConfigured,
}

/// Build/runtime mode of the worker.
///
/// Development mode logs every request with its arguments at `debug`;
/// production mode only traces module and function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Production,
    Development,
}

impl RuntimeMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }
}

impl Default for RuntimeMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub thread_name: String,
    /// Stack size in bytes; `None` keeps the platform default.
    pub stack_size: Option<usize>,
    pub mode: RuntimeMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
            mode: RuntimeMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub worker: WorkerConfig,
}

impl BridgeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the config file (if any) and apply environment overrides.
    ///
    /// An unreadable or malformed file is logged and ignored.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::path()
            .filter(|path| path.exists())
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(content) => match Self::from_toml_str(&content) {
                    Ok(config) => Some(config),
                    Err(err) => {
                        tracing::warn!("Failed to parse config at {}: {err}", path.display());
                        None
                    }
                },
                Err(err) => {
                    tracing::warn!("Failed to read config at {}: {err}", path.display());
                    None
                }
            })
            .unwrap_or_default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".tosync").join("config.toml"))
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(MODE_ENV) {
            match RuntimeMode::parse(&value) {
                Some(mode) => self.worker.mode = mode,
                None => tracing::warn!("Ignoring unknown {MODE_ENV} value '{value}'"),
            }
        }
        if let Some(name) = lookup(THREAD_NAME_ENV).filter(|n| !n.trim().is_empty()) {
            self.worker.thread_name = name;
        }
        if let Some(value) = lookup(STACK_SIZE_ENV) {
            match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => self.worker.stack_size = Some(size),
                _ => tracing::warn!("Ignoring invalid {STACK_SIZE_ENV} value '{value}'"),
            }
        }
    }
}

static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

/// Install an explicit configuration. Must run before the first call.
pub fn configure(config: BridgeConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyConfigured)
}

/// The active configuration, loading it on first use.
pub fn current() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::load)
}
