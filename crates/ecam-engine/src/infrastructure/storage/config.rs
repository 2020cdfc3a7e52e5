//! TOML-based configuration for the protocol engine.
//!
//! Reads and writes [`EngineConfig`]; the default location is:
//! - Windows:  `%APPDATA%\Ecam\engine.toml`
//! - Linux:    `~/.config/ecam/engine.toml`
//! - macOS:    `~/Library/Application Support/Ecam/engine.toml`
//!
//! ```toml
//! [engine]
//! log_level = "info"
//! ble_chunk_size = 20
//!
//! [timeouts]
//! v1_ms = 3000
//! v2_ble_ms = 1000
//! wifi_ms = 3000
//! busy_retry_ms = 100
//! mismatch_retry_ms = 100
//!
//! [retries]
//! timeout = 5
//! busy = 10
//! mismatch = 5
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]`, so a file that only
//! overrides one value still loads, and a missing file yields
//! [`EngineConfig::default()`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ecam_core::protocol::{LinkKind, ProtocolStrategy, ProtocolVariant, DEFAULT_BLE_PACKET_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::exchange::RetryPolicy;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level engine configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub timeouts: TimeoutSection,
    #[serde(default)]
    pub retries: RetrySection,
}

/// General engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSection {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Largest BLE write; longer requests are chunked.
    #[serde(default = "default_ble_chunk_size")]
    pub ble_chunk_size: usize,
}

/// Answer timeouts and retry delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutSection {
    #[serde(default = "default_v1_ms")]
    pub v1_ms: u64,
    #[serde(default = "default_v2_ble_ms")]
    pub v2_ble_ms: u64,
    #[serde(default = "default_wifi_ms")]
    pub wifi_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub busy_retry_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub mismatch_retry_ms: u64,
}

/// Retry limits per failure kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySection {
    #[serde(default = "default_timeout_retries")]
    pub timeout: u32,
    #[serde(default = "default_busy_retries")]
    pub busy: u32,
    #[serde(default = "default_mismatch_retries")]
    pub mismatch: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_ble_chunk_size() -> usize {
    DEFAULT_BLE_PACKET_SIZE
}
fn default_v1_ms() -> u64 {
    3_000
}
fn default_v2_ble_ms() -> u64 {
    1_000
}
fn default_wifi_ms() -> u64 {
    3_000
}
fn default_retry_delay_ms() -> u64 {
    100
}
fn default_timeout_retries() -> u32 {
    RetryPolicy::MAX_TIMEOUT_RETRIES
}
fn default_busy_retries() -> u32 {
    RetryPolicy::MAX_BUSY_RETRIES
}
fn default_mismatch_retries() -> u32 {
    RetryPolicy::MAX_MISMATCH_RETRIES
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ble_chunk_size: default_ble_chunk_size(),
        }
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            v1_ms: default_v1_ms(),
            v2_ble_ms: default_v2_ble_ms(),
            wifi_ms: default_wifi_ms(),
            busy_retry_ms: default_retry_delay_ms(),
            mismatch_retry_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            timeout: default_timeout_retries(),
            busy: default_busy_retries(),
            mismatch: default_mismatch_retries(),
        }
    }
}

impl EngineConfig {
    /// Builds the runtime retry policy for a connection using `strategy`.
    pub fn retry_policy(&self, strategy: &ProtocolStrategy) -> RetryPolicy {
        let timeout_ms = match (strategy.variant, strategy.link) {
            (_, LinkKind::Wifi) => self.timeouts.wifi_ms,
            (ProtocolVariant::V1, LinkKind::Ble) => self.timeouts.v1_ms,
            (ProtocolVariant::V2, LinkKind::Ble) => self.timeouts.v2_ble_ms,
        };
        RetryPolicy {
            response_timeout: Duration::from_millis(timeout_ms),
            busy_delay: Duration::from_millis(self.timeouts.busy_retry_ms),
            mismatch_delay: Duration::from_millis(self.timeouts.mismatch_retry_ms),
            max_timeout_retries: self.retries.timeout,
            max_busy_retries: self.retries.busy,
            max_mismatch_retries: self.retries.mismatch,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform base
/// directory cannot be determined from the environment.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("engine.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads an [`EngineConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Ecam"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ecam"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Ecam")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
