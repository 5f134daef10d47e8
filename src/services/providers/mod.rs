//! 服务商适配 - 业务能力层
//!
//! 每个后端一个适配器，只负责两件事：
//! - 把提示词翻译成一次出站 HTTP 请求（URL、鉴权头、请求体）
//! - 从该后端的响应包络中取出第一段文本
//!
//! 适配器不决定何时刷新令牌，只把托管代理返回的新令牌原样带出。

mod anthropic;
mod custom;
mod google;
mod hosted;
mod openai;

pub use anthropic::AnthropicMessages;
pub use custom::CustomEndpoint;
pub use google::GoogleGenerateContent;
pub use hosted::{HostedProxy, HOSTED_TEXT_PATH};
pub use openai::{OpenAiCompatible, DEEPSEEK_CHAT_URL, OPENAI_CHAT_URL};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::infrastructure::http_transport::{HttpRequest, HttpTransport};
use crate::models::{ErrorKind, Failure, Provider, ResolvedProvider};

/// 适配器成功输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOutput {
    pub text: String,
    /// 托管代理在本次调用中顺带刷新的访问令牌
    pub rotated_access_token: Option<String>,
}

impl AdapterOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rotated_access_token: None,
        }
    }
}

/// 一次调用的失败形态，分类交给 error_classifier
#[derive(Debug, Clone)]
pub enum CallError {
    /// 请求无法构建（配置问题）
    Build(Failure),
    /// 非 2xx 响应
    Http { status: u16, body: String },
    /// 没有拿到响应
    Transport(TransportError),
    /// 2xx 但取不到文本
    Parse(String),
}

pub trait ProviderAdapter: Send + Sync {
    /// 用于日志的名称
    fn name(&self) -> &'static str;

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure>;

    fn extract(&self, body: &Value) -> Option<AdapterOutput>;
}

/// 由解析结果得到对应的适配器
pub fn adapter_for(resolved: &ResolvedProvider, hosted_base_url: &str) -> Box<dyn ProviderAdapter> {
    match resolved {
        ResolvedProvider::Direct(config) => match config.provider {
            Provider::OpenAi => Box::new(OpenAiCompatible::openai(config)),
            Provider::DeepSeek => Box::new(OpenAiCompatible::deepseek(config)),
            Provider::Anthropic => Box::new(AnthropicMessages::new(config)),
            Provider::Google => Box::new(GoogleGenerateContent::new(config)),
            Provider::Custom => Box::new(CustomEndpoint::new(config)),
        },
        ResolvedProvider::HostedProxy(session) => {
            Box::new(HostedProxy::new(hosted_base_url, session))
        }
    }
}

/// 执行一次调用：构建 → 发送 → 校验状态 → 解析 JSON → 提取文本
pub async fn call<T: HttpTransport>(
    adapter: &dyn ProviderAdapter,
    transport: &T,
    prompt: &str,
) -> Result<AdapterOutput, CallError> {
    let request = adapter.build_request(prompt).map_err(CallError::Build)?;
    debug!("[{}] 发送请求，提示词长度: {} 字符", adapter.name(), prompt.len());

    let response = transport
        .post_json(request)
        .await
        .map_err(CallError::Transport)?;

    if !response.is_success() {
        warn!("[{}] 服务返回 HTTP {}", adapter.name(), response.status);
        return Err(CallError::Http {
            status: response.status,
            body: response.body,
        });
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| CallError::Parse(format!("Response body is not valid JSON: {}", e)))?;

    adapter.extract(&body).ok_or_else(|| {
        CallError::Parse("Could not extract response text from API response.".to_string())
    })
}

/// OpenAI 风格的单条用户消息
#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

pub(crate) fn to_body<T: Serialize>(body: &T) -> Result<Value, Failure> {
    serde_json::to_value(body).map_err(|e| {
        Failure::new(
            ErrorKind::General,
            format!("Failed to encode request body: {}", e),
        )
    })
}

/// 按 JSON Pointer 取非空字符串
pub(crate) fn non_empty_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
