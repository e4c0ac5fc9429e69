//! 后端策略表
//!
//! provider 标识 -> { 规范化变体, 工具结果格式 }，在构建智能体时解析一次；
//! 同时负责按配置创建具体的 LlmClient（缺少 API Key 时回退到 Mock）。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{LlmClient, LlmError, MockLlmClient, OpenAiCompatClient};
use crate::react::NormalizerVariant;

/// 工具结果写入 tool 消息时的形态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolResultFormat {
    /// 字符串原样，其余序列化为 JSON
    #[default]
    Structured,
    /// 一律压平成纯文本（部分后端只接受字符串工具结果）
    TextOnly,
}

/// 与后端相关的差异，集中在这里而不是散落在构建代码中
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    pub normalizer: NormalizerVariant,
    pub tool_results: ToolResultFormat,
}

/// 已知后端的默认端点与 API Key 环境变量
struct ProviderPreset {
    id: &'static str,
    base_url: &'static str,
    key_env: &'static str,
    default_model: &'static str,
    profile: ProviderProfile,
}

const PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        id: "openai",
        base_url: "https://api.openai.com/v1",
        key_env: "OPENAI_API_KEY",
        default_model: "gpt-4o-mini",
        profile: ProviderProfile {
            normalizer: NormalizerVariant::Concat,
            tool_results: ToolResultFormat::Structured,
        },
    },
    ProviderPreset {
        id: "deepseek",
        base_url: "https://api.deepseek.com",
        key_env: "DEEPSEEK_API_KEY",
        default_model: "deepseek-chat",
        profile: ProviderProfile {
            normalizer: NormalizerVariant::Concat,
            tool_results: ToolResultFormat::Structured,
        },
    },
    ProviderPreset {
        id: "google",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        key_env: "GEMINI_API_KEY",
        default_model: "gemini-2.5-flash",
        profile: ProviderProfile {
            normalizer: NormalizerVariant::Concat,
            tool_results: ToolResultFormat::Structured,
        },
    },
    ProviderPreset {
        id: "mistral",
        base_url: "https://api.mistral.ai/v1",
        key_env: "MISTRAL_API_KEY",
        default_model: "mistral-large-latest",
        profile: ProviderProfile {
            normalizer: NormalizerVariant::Lines,
            tool_results: ToolResultFormat::TextOnly,
        },
    },
];

fn preset(provider: &str) -> Option<&'static ProviderPreset> {
    PRESETS.iter().find(|p| p.id == provider)
}

impl ProviderProfile {
    /// 按 provider 标识解析；未知标识回退到 openai 的策略
    pub fn resolve(provider: &str) -> Self {
        let provider = provider.to_lowercase();
        if provider == "mock" {
            return Self::default();
        }
        match preset(&provider) {
            Some(p) => p.profile,
            None => {
                tracing::warn!(provider = %provider, "unknown provider, using openai profile");
                Self::default()
            }
        }
    }
}

/// 按配置创建后端；找不到 API Key 或 provider 为 mock 时使用 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM");
        return Ok(Arc::new(MockLlmClient::new()));
    }
    let preset = preset(&provider).or_else(|| preset("openai"));
    let Some(preset) = preset else {
        return Ok(Arc::new(MockLlmClient::new()));
    };

    let key_env = cfg.llm.api_key_env.as_deref().unwrap_or(preset.key_env);
    let Ok(api_key) = std::env::var(key_env) else {
        tracing::warn!(provider = %provider, key_env = %key_env, "No API key set, using Mock LLM");
        return Ok(Arc::new(MockLlmClient::new()));
    };

    let base_url = cfg.llm.base_url.as_deref().unwrap_or(preset.base_url);
    let model = cfg.llm.model.as_deref().unwrap_or(preset.default_model);
    tracing::info!(provider = %provider, model = %model, "Using OpenAI-compatible LLM");
    let client = OpenAiCompatClient::new(&provider, base_url, model, &api_key, cfg.llm.timeouts.request)?;
    Ok(Arc::new(client))
}
