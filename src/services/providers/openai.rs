use serde::Serialize;
use serde_json::Value;

use super::{non_empty_at, to_body, AdapterOutput, ChatMessage, ProviderAdapter};
use crate::infrastructure::http_transport::HttpRequest;
use crate::models::{Failure, ProviderConfig};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEEPSEEK_CHAT_URL: &str = "https://api.deepseek.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

/// OpenAI Chat Completions 协议（DeepSeek 与之同构，仅地址不同）
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    name: &'static str,
    url: &'static str,
    api_key: String,
    model: String,
}

impl OpenAiCompatible {
    pub fn openai(config: &ProviderConfig) -> Self {
        Self {
            name: "openai",
            url: OPENAI_CHAT_URL,
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
        }
    }

    pub fn deepseek(config: &ProviderConfig) -> Self {
        Self {
            name: "deepseek",
            url: DEEPSEEK_CHAT_URL,
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
        }
    }
}

impl ProviderAdapter for OpenAiCompatible {
    fn name(&self) -> &'static str {
        self.name
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: [ChatMessage::user(prompt)],
            temperature: 0.7,
        };
        Ok(HttpRequest::post(self.url, to_body(&body)?).bearer(&self.api_key))
    }

    fn extract(&self, body: &Value) -> Option<AdapterOutput> {
        non_empty_at(body, "/choices/0/message/content").map(AdapterOutput::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use serde_json::json;

    #[test]
    fn test_openai_request_shape() {
        let config = ProviderConfig::new(Provider::OpenAi, "sk-test");
        let request = OpenAiCompatible::openai(&config).build_request("hi").unwrap();

        assert_eq!(request.url, OPENAI_CHAT_URL);
        assert_eq!(request.header_value("Authorization"), Some("Bearer sk-test"));
        assert_eq!(request.body["model"], "gpt-4o-mini");
        assert_eq!(request.body["messages"], json!([{"role": "user", "content": "hi"}]));
        assert_eq!(request.body["temperature"], json!(0.7));
    }

    #[test]
    fn test_deepseek_uses_own_endpoint_and_model() {
        let config = ProviderConfig::new(Provider::DeepSeek, "ds");
        let request = OpenAiCompatible::deepseek(&config).build_request("hi").unwrap();

        assert_eq!(request.url, DEEPSEEK_CHAT_URL);
        assert_eq!(request.body["model"], "deepseek-chat");
    }

    #[test]
    fn test_empty_content_is_not_extracted() {
        let config = ProviderConfig::new(Provider::OpenAi, "sk");
        let adapter = OpenAiCompatible::openai(&config);
        let body = json!({"choices": [{"message": {"content": ""}}]});
        assert!(adapter.extract(&body).is_none());
    }
}
