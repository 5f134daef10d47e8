use serde::Serialize;
use serde_json::Value;

use super::{non_empty_at, to_body, AdapterOutput, ChatMessage, ProviderAdapter};
use crate::infrastructure::http_transport::HttpRequest;
use crate::models::{ErrorKind, Failure, ProviderConfig};

/// 依次尝试的常见响应字段
const RESPONSE_POINTERS: &[&str] = &[
    "/choices/0/message/content",
    "/content/0/text",
    "/response",
    "/text",
];

#[derive(Debug, Serialize)]
struct CustomChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

/// 用户自定义端点，沿用 chat messages 请求体
#[derive(Debug, Clone)]
pub struct CustomEndpoint {
    endpoint: Option<String>,
    api_key: String,
    model: String,
}

impl CustomEndpoint {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            endpoint: config
                .endpoint
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
        }
    }
}

impl ProviderAdapter for CustomEndpoint {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            Failure::new(
                ErrorKind::Config,
                "Custom endpoint not configured. Please set a custom API endpoint in the settings.",
            )
        })?;
        let body = CustomChatBody {
            model: &self.model,
            messages: [ChatMessage::user(prompt)],
        };
        Ok(HttpRequest::post(endpoint, to_body(&body)?).bearer(&self.api_key))
    }

    fn extract(&self, body: &Value) -> Option<AdapterOutput> {
        RESPONSE_POINTERS
            .iter()
            .find_map(|pointer| non_empty_at(body, pointer))
            .map(AdapterOutput::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use serde_json::json;

    fn adapter() -> CustomEndpoint {
        let config = ProviderConfig::new(Provider::Custom, "ck")
            .with_endpoint("https://llm.internal/v1/chat");
        CustomEndpoint::new(&config)
    }

    #[test]
    fn test_custom_request_shape() {
        let request = adapter().build_request("hi").unwrap();
        assert_eq!(request.url, "https://llm.internal/v1/chat");
        assert_eq!(request.header_value("Authorization"), Some("Bearer ck"));
        assert_eq!(
            request.body,
            json!({"model": "default", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn test_missing_endpoint_is_config_failure() {
        let config = ProviderConfig::new(Provider::Custom, "ck").with_endpoint("   ");
        let failure = CustomEndpoint::new(&config).build_request("hi").unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Config);
    }

    #[test]
    fn test_extract_tries_fields_in_order() {
        let adapter = adapter();
        let both = json!({"choices": [{"message": {"content": "first"}}], "text": "last"});
        assert_eq!(adapter.extract(&both).unwrap().text, "first");

        let anthropic_like = json!({"content": [{"text": "second"}]});
        assert_eq!(adapter.extract(&anthropic_like).unwrap().text, "second");

        let blank_then_text = json!({"response": "", "text": "fallback"});
        assert_eq!(adapter.extract(&blank_then_text).unwrap().text, "fallback");

        assert!(adapter.extract(&json!({"output": "nope"})).is_none());
    }
}
