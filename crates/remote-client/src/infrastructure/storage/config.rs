//! TOML-based settings for the device client.
//!
//! The file is looked up in this order:
//! 1. an explicit path (the `--config` flag),
//! 2. the `REMOTE_BRIDGE_CONFIG` environment variable,
//! 3. the platform config directory:
//!    - Windows: `%APPDATA%\RemoteBridge\config.toml`
//!    - Linux:   `$XDG_CONFIG_HOME/remote-bridge/config.toml` (or `~/.config/...`)
//!    - macOS:   `~/Library/Application Support/RemoteBridge/config.toml`
//!
//! Example file:
//!
//! ```toml
//! log_level = "debug"
//!
//! [network]
//! http_port = 8000
//! connect_timeout_secs = 10
//! request_timeout_secs = 30
//! ws_open_timeout_secs = 10
//!
//! [session]
//! heartbeat_interval_secs = 30
//! reconnect_retries = 3
//! reconnect_initial_backoff_ms = 500
//! reconnect_max_backoff_ms = 8000
//! ```
//!
//! Every field has a serde default, so a partial file (or none at all) is
//! valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session_controller::{ConnectPolicy, SessionSettings};
use crate::infrastructure::host_api::HttpSettings;
use crate::infrastructure::network::ChannelSettings;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REMOTE_BRIDGE_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Ports and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Host port for HTTP and WebSocket when the host address has none.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// TCP connect timeout for HTTP requests.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for HTTP requests (uploads included).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Time allowed for the WebSocket handshake.
    #[serde(default = "default_ws_open_timeout_secs")]
    pub ws_open_timeout_secs: u64,
}

/// Event channel keepalive and reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Extra open attempts after a failed `connect()`.  `0` disables retries.
    #[serde(default)]
    pub reconnect_retries: u32,
    #[serde(default = "default_reconnect_initial_backoff_ms")]
    pub reconnect_initial_backoff_ms: u64,
    #[serde(default = "default_reconnect_max_backoff_ms")]
    pub reconnect_max_backoff_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_ws_open_timeout_secs() -> u64 {
    10
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}
fn default_reconnect_initial_backoff_ms() -> u64 {
    500
}
fn default_reconnect_max_backoff_ms() -> u64 {
    8000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            network: NetworkConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            ws_open_timeout_secs: default_ws_open_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_retries: 0,
            reconnect_initial_backoff_ms: default_reconnect_initial_backoff_ms(),
            reconnect_max_backoff_ms: default_reconnect_max_backoff_ms(),
        }
    }
}

// ── Conversions into runtime settings ─────────────────────────────────────────

impl ClientConfig {
    /// Settings for the HTTP host API.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            port: self.network.http_port,
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.network.request_timeout_secs),
        }
    }

    /// Settings for WebSocket event channels.
    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            open_timeout: Duration::from_secs(self.network.ws_open_timeout_secs),
            heartbeat_interval: Duration::from_secs(self.session.heartbeat_interval_secs),
        }
    }

    /// Settings for the session controller.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            host_port: self.network.http_port,
            connect_policy: ConnectPolicy {
                retries: self.session.reconnect_retries,
                initial_backoff: Duration::from_millis(self.session.reconnect_initial_backoff_ms),
                max_backoff: Duration::from_millis(self.session.reconnect_max_backoff_ms),
            },
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither `explicit` nor
/// [`CONFIG_ENV_VAR`] is set and the platform directory is unknown.
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads a [`ClientConfig`] from `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the config path and loads it.
///
/// # Errors
///
/// See [`config_file_path`] and [`load_config_from`].
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    load_config_from(&config_file_path(explicit)?)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
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

/// Resolves the platform config directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RemoteBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("remote-bridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RemoteBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A unique scratch path under the system temp dir.
    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("remote-bridge-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_default_config_matches_documented_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.network.http_port, 8000);
        assert_eq!(cfg.network.connect_timeout_secs, 10);
        assert_eq!(cfg.network.request_timeout_secs, 30);
        assert_eq!(cfg.network.ws_open_timeout_secs, 10);
        assert_eq!(cfg.session.heartbeat_interval_secs, 30);
        assert_eq!(cfg.session.reconnect_retries, 0);
    }

    #[test]
    fn test_partial_file_fills_missing_fields_with_defaults() {
        // Arrange
        let toml_str = r#"
            [session]
            reconnect_retries = 4
        "#;

        // Act
        let cfg: ClientConfig = toml::from_str(toml_str).expect("parse");

        // Assert
        assert_eq!(cfg.session.reconnect_retries, 4);
        assert_eq!(cfg.session.heartbeat_interval_secs, 30);
        assert_eq!(cfg.network, NetworkConfig::default());
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_empty_file_is_default_config() {
        let cfg: ClientConfig = toml::from_str("").expect("parse");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_settings_conversions_use_config_values() {
        let mut cfg = ClientConfig::default();
        cfg.network.http_port = 9100;
        cfg.network.ws_open_timeout_secs = 3;
        cfg.session.heartbeat_interval_secs = 15;
        cfg.session.reconnect_retries = 2;

        let http = cfg.http_settings();
        let channel = cfg.channel_settings();
        let session = cfg.session_settings();

        assert_eq!(http.port, 9100);
        assert_eq!(http.request_timeout, Duration::from_secs(30));
        assert_eq!(channel.open_timeout, Duration::from_secs(3));
        assert_eq!(channel.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(session.host_port, 9100);
        assert_eq!(session.connect_policy.retries, 2);
        assert_eq!(session.connect_policy.max_backoff, Duration::from_millis(8000));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/explicit.toml");
        assert_eq!(config_file_path(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = scratch_path("absent.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let path = scratch_path("config.toml");
        let mut cfg = ClientConfig::default();
        cfg.log_level = "debug".to_string();
        cfg.session.reconnect_retries = 3;

        // Act
        save_config(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = scratch_path("bad.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "network = [").unwrap();

        let err = load_config_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
