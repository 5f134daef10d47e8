use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::models::session::AuthSession;

/// 各直连服务商未配置模型名时使用的默认模型
static DEFAULT_MODELS: phf::Map<&'static str, &'static str> = phf_map! {
    "openai" => "gpt-4o-mini",
    "anthropic" => "claude-3-5-sonnet-20241022",
    "google" => "gemini-2.5-flash",
    "deepseek" => "deepseek-chat",
    "custom" => "default",
};

/// 直连服务商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
    /// 用户自定义的 OpenAI 兼容端点
    Custom,
}

impl Provider {
    /// 持久化设置中使用的标识
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::DeepSeek => "deepseek",
            Provider::Custom => "custom",
        }
    }

    /// 默认模型名
    pub fn default_model(self) -> &'static str {
        DEFAULT_MODELS.get(self.as_str()).copied().unwrap_or("default")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 无法识别的服务商标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown AI provider '{}'", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "deepseek" => Ok(Provider::DeepSeek),
            "custom" => Ok(Provider::Custom),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// 直连服务商配置
///
/// `endpoint` 仅在 `provider == Custom` 时有意义且必须非空；
/// 解析完成后 `model_name` 总是已填充（未配置时取服务商默认值）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub use_custom_api: bool,
    pub provider: Provider,
    pub endpoint: Option<String>,
    pub api_key: String,
    pub model_name: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            use_custom_api: true,
            provider,
            endpoint: None,
            api_key: api_key.into(),
            model_name: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// 实际使用的模型名
    pub fn model(&self) -> &str {
        match self.model_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.provider.default_model(),
        }
    }
}

/// 单次查询最终使用的后端
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedProvider {
    /// 使用用户自己的 API Key 直连第三方服务
    Direct(ProviderConfig),
    /// 通过托管代理服务，凭访问/刷新令牌鉴权
    HostedProxy(AuthSession),
}

impl ResolvedProvider {
    pub fn is_hosted(&self) -> bool {
        matches!(self, ResolvedProvider::HostedProxy(_))
    }

    /// 用于日志的后端名称
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedProvider::Direct(config) => config.provider.as_str(),
            ResolvedProvider::HostedProxy(_) => "hosted-proxy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_ids() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" Google ".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("deepseek".parse::<Provider>().unwrap(), Provider::DeepSeek);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn test_default_models() {
        assert_eq!(Provider::Google.default_model(), "gemini-2.5-flash");
        assert_eq!(Provider::OpenAi.default_model(), "gpt-4o-mini");
        assert_eq!(Provider::Custom.default_model(), "default");
    }

    #[test]
    fn test_blank_model_name_uses_default() {
        let config = ProviderConfig::new(Provider::DeepSeek, "sk").with_model("  ");
        assert_eq!(config.model(), "deepseek-chat");

        let config = ProviderConfig::new(Provider::DeepSeek, "sk").with_model("deepseek-reasoner");
        assert_eq!(config.model(), "deepseek-reasoner");
    }
}
