//! TOML-based persistence of the DeviceFinder settings.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DeviceFinder\config.toml`
//! - Linux:    `~/.config/devicefinder/config.toml`
//! - macOS:    `~/Library/Application Support/DeviceFinder/config.toml`
//!
//! The `DEVICEFINDER_CONFIG` environment variable replaces the whole path.
//!
//! ```toml
//! [agent]
//! log_level = "info"
//!
//! [network]
//! target_ip = ""          # empty: no direct target
//! use_broadcast = true
//! use_advertisement = false
//! use_sweep = false
//! tcp_listen_port = 80
//! udp_listen_port = 68
//! udp_target_port = 9910
//! send_frequency_ms = 1000
//! bind_address = "0.0.0.0"
//!
//! [advertisement]
//! service_type = "_test._tcp.local."
//! instance_name = "JumpWDevice"
//! port = 8080
//!
//! [listener]
//! idle_timeout_secs = 60
//! ```
//!
//! Every field carries a serde default, so a partial (or empty) file is valid
//! and older files keep loading when new fields are added.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use finder_core::protocol::defaults::{
    DEFAULT_SEND_FREQUENCY_MS, SERVICE_NAME, SERVICE_PORT, SERVICE_TYPE, TCP_IDLE_TIMEOUT,
    TCP_LISTEN_PORT, UDP_LISTEN_PORT, UDP_TARGET_PORT,
};
use finder_core::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::infrastructure::network::advertise::ServiceRecord;

/// Environment variable that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "DEVICEFINDER_CONFIG";

/// Accepted range of `network.send_frequency_ms`.
pub const SEND_FREQUENCY_RANGE_MS: std::ops::RangeInclusive<u32> = 1..=1000;

/// Error type for configuration file operations and settings validation.
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

    /// `network.target_ip` is neither empty nor a dotted IPv4 address.
    #[error("invalid target IP address: {0:?}")]
    InvalidTargetIp(String),

    /// `network.bind_address` is not an IP address.
    #[error("invalid bind address: {0:?}")]
    InvalidBindAddress(String),

    /// No discovery method is selected and no target IP is set.
    #[error("at least one discovery method must be selected")]
    NoMethodSelected,

    /// `network.send_frequency_ms` is outside 1..=1000.
    #[error("send frequency {0} ms is outside 1..=1000 ms")]
    FrequencyOutOfRange(u32),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub advertisement: AdvertisementSettings,
    #[serde(default)]
    pub listener: ListenerSettings,
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The discovery settings edited in the settings dialog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    /// Direct probe target.  Empty means none.
    #[serde(default)]
    pub target_ip: String,
    #[serde(default = "default_true")]
    pub use_broadcast: bool,
    #[serde(default)]
    pub use_advertisement: bool,
    #[serde(default)]
    pub use_sweep: bool,
    #[serde(default = "default_tcp_listen_port")]
    pub tcp_listen_port: u16,
    #[serde(default = "default_udp_listen_port")]
    pub udp_listen_port: u16,
    #[serde(default = "default_udp_target_port")]
    pub udp_target_port: u16,
    #[serde(default = "default_send_frequency_ms")]
    pub send_frequency_ms: u32,
    /// Address both listener sockets bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// The mDNS service record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvertisementSettings {
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    #[serde(default = "default_service_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerSettings {
    /// Seconds a TCP connection may stay silent before it is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_tcp_listen_port() -> u16 {
    TCP_LISTEN_PORT
}
fn default_udp_listen_port() -> u16 {
    UDP_LISTEN_PORT
}
fn default_udp_target_port() -> u16 {
    UDP_TARGET_PORT
}
fn default_send_frequency_ms() -> u32 {
    DEFAULT_SEND_FREQUENCY_MS
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_service_type() -> String {
    SERVICE_TYPE.to_string()
}
fn default_instance_name() -> String {
    SERVICE_NAME.to_string()
}
fn default_service_port() -> u16 {
    SERVICE_PORT
}
fn default_idle_timeout_secs() -> u64 {
    TCP_IDLE_TIMEOUT.as_secs()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            target_ip: String::new(),
            use_broadcast: default_true(),
            use_advertisement: false,
            use_sweep: false,
            tcp_listen_port: default_tcp_listen_port(),
            udp_listen_port: default_udp_listen_port(),
            udp_target_port: default_udp_target_port(),
            send_frequency_ms: default_send_frequency_ms(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for AdvertisementSettings {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            instance_name: default_instance_name(),
            port: default_service_port(),
        }
    }
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

impl NetworkSettings {
    /// The direct target, if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTargetIp`] when `target_ip` is neither
    /// empty nor a dotted IPv4 address.
    pub fn direct_target(&self) -> Result<Option<Ipv4Addr>, ConfigError> {
        let text = self.target_ip.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<Ipv4Addr>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidTargetIp(self.target_ip.clone()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` does not parse.
    pub fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        self.bind_address
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))
    }

    fn any_method_selected(&self) -> bool {
        self.use_broadcast || self.use_advertisement || self.use_sweep
    }

    /// Applies the settings dialog's checks.
    ///
    /// A target IP with no method selected is accepted with a warning, since
    /// the direct probe ignores the method flags anyway.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let target = self.direct_target()?;
        self.bind_ip()?;

        if !SEND_FREQUENCY_RANGE_MS.contains(&self.send_frequency_ms) {
            return Err(ConfigError::FrequencyOutOfRange(self.send_frequency_ms));
        }

        if !self.any_method_selected() {
            match target {
                Some(ip) => warn!("no discovery method selected; probing {ip} directly"),
                None => return Err(ConfigError::NoMethodSelected),
            }
        }
        Ok(())
    }

    /// Validates and converts to the engine's [`DiscoveryConfig`].
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised by [`Self::validate`].
    pub fn to_discovery_config(&self) -> Result<DiscoveryConfig, ConfigError> {
        self.validate()?;
        Ok(DiscoveryConfig {
            use_broadcast: self.use_broadcast,
            use_advertisement: self.use_advertisement,
            use_sweep: self.use_sweep,
            direct_target: self.direct_target()?,
            tcp_listen_port: self.tcp_listen_port,
            udp_listen_port: self.udp_listen_port,
            udp_target_port: self.udp_target_port,
            send_frequency_ms: self.send_frequency_ms,
        })
    }
}

impl AdvertisementSettings {
    pub fn to_service_record(&self) -> ServiceRecord {
        ServiceRecord {
            service_type: self.service_type.clone(),
            instance_name: self.instance_name.clone(),
            port: self.port,
        }
    }
}

impl ListenerSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the config file path, honouring [`CONFIG_PATH_ENV`].
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if neither the override nor
/// the platform directory is available.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the settings from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the default location.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
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

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DeviceFinder"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("devicefinder"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DeviceFinder")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
