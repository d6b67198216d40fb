//! User-mutable generation settings with an explicit persistence boundary.
//!
//! [`SettingsStore`] loads `settings.toml` once at startup and rewrites it on
//! every [`SettingsStore::update`]. Readers take a [`Settings`] snapshot; the
//! story relay never writes settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::provider::Provider;

pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (500, 4000);

/// Per-provider credentials. Never logged.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub qwen: Option<String>,
    pub deepseek: Option<String>,
}

impl ApiKeys {
    /// The non-empty key for `provider`, if configured.
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Qwen => self.qwen.as_deref(),
            Provider::DeepSeek => self.deepseek.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn set(&mut self, provider: Provider, key: Option<String>) {
        match provider {
            Provider::Qwen => self.qwen = key,
            Provider::DeepSeek => self.deepseek = key,
        }
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("qwen", &mask(&self.qwen))
            .field("deepseek", &mask(&self.deepseek))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Provider,
    /// Model id; `None` means the provider's default model.
    pub selected_model: Option<String>,
    pub stream_enabled: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    // tables serialize after plain values
    pub api_keys: ApiKeys,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::Qwen,
            api_keys: ApiKeys::default(),
            selected_model: None,
            stream_enabled: true,
            temperature: 0.85,
            max_tokens: 1500,
        }
    }
}

impl Settings {
    /// Switch provider. A selected model that belongs to another provider's
    /// catalogue is cleared so the new provider's default applies.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        if let Some(model) = &self.selected_model {
            let foreign = Provider::ALL
                .iter()
                .filter(|p| **p != provider)
                .any(|p| p.models().any(|m| m.id == model.as_str()));
            if foreign {
                self.selected_model = None;
            }
        }
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = max_tokens.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1);
    }

    /// The model a request should use: the selection, or the provider default.
    pub fn effective_model(&self) -> &str {
        self.selected_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// Values taken from the environment at load time. Applied on top of every
/// snapshot but never written back to disk.
#[derive(Clone, Default)]
struct EnvOverrides {
    provider: Option<Provider>,
    qwen_key: Option<String>,
    deepseek_key: Option<String>,
    model: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let provider = std::env::var("TIMEWARP_PROVIDER")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring TIMEWARP_PROVIDER");
                    None
                }
            });
        Self {
            provider,
            qwen_key: std::env::var("TIMEWARP_QWEN_API_KEY").ok(),
            deepseek_key: std::env::var("TIMEWARP_DEEPSEEK_API_KEY").ok(),
            model: std::env::var("TIMEWARP_MODEL").ok(),
        }
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(key) = &self.qwen_key {
            settings.api_keys.qwen = Some(key.clone());
        }
        if let Some(key) = &self.deepseek_key {
            settings.api_keys.deepseek = Some(key.clone());
        }
        if let Some(model) = &self.model {
            settings.selected_model = Some(model.clone());
        }
    }
}

/// Process-wide settings store.
pub struct SettingsStore {
    path: Option<PathBuf>,
    persisted: RwLock<Settings>,
    overrides: EnvOverrides,
}

impl SettingsStore {
    /// Load settings from `path` (defaults if missing) and capture env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let persisted = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read settings file")?;
            toml::from_str(&contents).context("failed to parse settings TOML")?
        } else {
            tracing::info!("no settings file at {}, using defaults", path.display());
            Settings::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            persisted: RwLock::new(persisted),
            overrides: EnvOverrides::from_env(),
        })
    }

    /// A store that never touches disk or the environment.
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            persisted: RwLock::new(settings),
            overrides: EnvOverrides::default(),
        }
    }

    /// Current settings, with environment overrides applied.
    pub fn snapshot(&self) -> Settings {
        let mut settings = match self.persisted.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        self.overrides.apply(&mut settings);
        settings
    }

    /// Mutate the persisted settings and save them. Returns the new snapshot.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings> {
        {
            let mut guard = self
                .persisted
                .write()
                .map_err(|e| anyhow::anyhow!("settings lock poisoned: {e}"))?;
            f(&mut guard);
            if let Some(path) = &self.path {
                save_settings(path, &guard)?;
            }
        }
        Ok(self.snapshot())
    }
}

/// Write settings atomically (tmp + rename).
fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let contents = toml::to_string(settings).context("failed to serialize settings")?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).context("failed to rename temp settings file")?;
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}
