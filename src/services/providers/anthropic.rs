use serde::Serialize;
use serde_json::Value;

use super::{non_empty_at, to_body, AdapterOutput, ChatMessage, ProviderAdapter};
use crate::infrastructure::http_transport::HttpRequest;
use crate::models::{Failure, ProviderConfig};

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

/// Anthropic Messages 协议：`x-api-key` 鉴权并带版本头
#[derive(Debug, Clone)]
pub struct AnthropicMessages {
    api_key: String,
    model: String,
}

impl AnthropicMessages {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
        }
    }
}

impl ProviderAdapter for AnthropicMessages {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure> {
        let body = MessagesBody {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: [ChatMessage::user(prompt)],
        };
        Ok(HttpRequest::post(ANTHROPIC_MESSAGES_URL, to_body(&body)?)
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn extract(&self, body: &Value) -> Option<AdapterOutput> {
        non_empty_at(body, "/content/0/text").map(AdapterOutput::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use serde_json::json;

    #[test]
    fn test_anthropic_request_shape() {
        let config = ProviderConfig::new(Provider::Anthropic, "ak").with_model("claude-sonnet-4");
        let request = AnthropicMessages::new(&config).build_request("hi").unwrap();

        assert_eq!(request.url, ANTHROPIC_MESSAGES_URL);
        assert_eq!(request.header_value("x-api-key"), Some("ak"));
        assert_eq!(request.header_value("anthropic-version"), Some("2023-06-01"));
        assert_eq!(request.header_value("Authorization"), None);
        assert_eq!(
            request.body,
            json!({
                "model": "claude-sonnet-4",
                "max_tokens": 4096,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }
}
