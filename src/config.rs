use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TimewarpConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub geo: GeoConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub capsule_db: String,
    pub settings_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeoConfig {
    /// Base URL of the relay that answers `/api/edge/info`.
    pub edge_url: String,
    pub edge_timeout_ms: u64,
    pub device_timeout_ms: u64,
    /// Nominatim-compatible reverse geocoding service.
    pub geocoder_url: String,
    /// Coordinates reported by the device locator. Leave unset to treat
    /// geolocation as unavailable.
    pub device_latitude: Option<f64>,
    pub device_longitude: Option<f64>,
}

/// Per-provider endpoint overrides. Unset entries use the built-in table.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub qwen_endpoint: Option<String>,
    pub deepseek_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_timewarp_dir();
        Self {
            capsule_db: dir.join("capsules.db").to_string_lossy().into_owned(),
            settings_path: dir.join("settings.toml").to_string_lossy().into_owned(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            edge_url: "http://127.0.0.1:8787".into(),
            edge_timeout_ms: 3_000,
            device_timeout_ms: 10_000,
            geocoder_url: "https://nominatim.openstreetmap.org".into(),
            device_latitude: None,
            device_longitude: None,
        }
    }
}

/// Returns `~/.timewarp/`
pub fn default_timewarp_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".timewarp")
}

/// Returns the default config file path: `~/.timewarp/config.toml`
pub fn default_config_path() -> PathBuf {
    default_timewarp_dir().join("config.toml")
}

impl TimewarpConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TimewarpConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (TIMEWARP_HOST, TIMEWARP_PORT,
    /// TIMEWARP_LOG_LEVEL, TIMEWARP_CAPSULE_DB, TIMEWARP_EDGE_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TIMEWARP_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("TIMEWARP_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid TIMEWARP_PORT"),
            }
        }
        if let Ok(val) = std::env::var("TIMEWARP_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TIMEWARP_CAPSULE_DB") {
            self.storage.capsule_db = val;
        }
        if let Ok(val) = std::env::var("TIMEWARP_EDGE_URL") {
            self.geo.edge_url = val;
        }
    }

    /// Resolve the capsule database path, expanding `~` if needed.
    pub fn resolved_capsule_db(&self) -> PathBuf {
        expand_tilde(&self.storage.capsule_db)
    }

    /// Resolve the settings file path, expanding `~` if needed.
    pub fn resolved_settings_path(&self) -> PathBuf {
        expand_tilde(&self.storage.settings_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
