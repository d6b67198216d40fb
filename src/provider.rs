//! Upstream chat-completion providers and their model catalogue.

use serde::{Deserialize, Serialize};

use crate::config::ProvidersConfig;

/// Supported chat-completion providers. Both speak the OpenAI-compatible
/// envelope and `data:` framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Alibaba Cloud DashScope (Qwen models).
    #[default]
    Qwen,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

/// Static endpoint and default model for a provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub provider: Provider,
    pub endpoint: &'static str,
    pub default_model: &'static str,
}

const PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        provider: Provider::Qwen,
        endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions",
        default_model: "qwen-turbo",
    },
    ProviderSpec {
        provider: Provider::DeepSeek,
        endpoint: "https://api.deepseek.com/chat/completions",
        default_model: "deepseek-chat",
    },
];

/// A selectable model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub provider: Provider,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "qwen-turbo",
        provider: Provider::Qwen,
        name: "通义千问 Turbo",
        description: "速度快，成本低，适合日常使用",
    },
    ModelInfo {
        id: "qwen-plus",
        provider: Provider::Qwen,
        name: "通义千问 Plus",
        description: "效果与速度均衡",
    },
    ModelInfo {
        id: "qwen-max",
        provider: Provider::Qwen,
        name: "通义千问 Max",
        description: "效果最好，适合复杂叙事",
    },
    ModelInfo {
        id: "deepseek-chat",
        provider: Provider::DeepSeek,
        name: "DeepSeek Chat",
        description: "通用对话模型，高性价比",
    },
    ModelInfo {
        id: "deepseek-reasoner",
        provider: Provider::DeepSeek,
        name: "DeepSeek Reasoner",
        description: "推理增强模型",
    },
];

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Qwen, Provider::DeepSeek];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qwen => "qwen",
            Self::DeepSeek => "deepseek",
        }
    }

    pub fn spec(&self) -> &'static ProviderSpec {
        PROVIDERS
            .iter()
            .find(|s| s.provider == *self)
            .unwrap_or(&PROVIDERS[0])
    }

    pub fn default_model(&self) -> &'static str {
        self.spec().default_model
    }

    /// Endpoint URL, honoring any override in config.
    pub fn endpoint(&self, overrides: &ProvidersConfig) -> String {
        let custom = match self {
            Self::Qwen => overrides.qwen_endpoint.as_deref(),
            Self::DeepSeek => overrides.deepseek_endpoint.as_deref(),
        };
        custom.unwrap_or(self.spec().endpoint).to_string()
    }

    /// Models offered by this provider.
    pub fn models(&self) -> impl Iterator<Item = &'static ModelInfo> + '_ {
        MODELS.iter().filter(move |m| m.provider == *self)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qwen" => Ok(Self::Qwen),
            "deepseek" => Ok(Self::DeepSeek),
            _ => Err(format!("unknown provider: {s}. Supported: qwen, deepseek")),
        }
    }
}
