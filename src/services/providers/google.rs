use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use super::{non_empty_at, to_body, AdapterOutput, ProviderAdapter};
use crate::infrastructure::http_transport::HttpRequest;
use crate::models::{ErrorKind, Failure, ProviderConfig};

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GenerateContentBody<'a> {
    contents: [Content<'a>; 1],
}

/// Gemini generateContent 协议：API Key 放在查询参数里
#[derive(Debug, Clone)]
pub struct GoogleGenerateContent {
    api_key: String,
    model: String,
}

impl GoogleGenerateContent {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
        }
    }

    /// 模型名作为单个路径段、API Key 作为查询参数，两者都做百分号编码
    fn url(&self) -> Result<String, Failure> {
        let invalid = || Failure::new(ErrorKind::Config, "Invalid Google API base URL.");
        let mut url = Url::parse(GOOGLE_API_BASE).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(&format!("{}:generateContent", self.model));
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url.into())
    }
}

impl ProviderAdapter for GoogleGenerateContent {
    fn name(&self) -> &'static str {
        "google"
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure> {
        let body = GenerateContentBody {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };
        Ok(HttpRequest::post(self.url()?, to_body(&body)?))
    }

    fn extract(&self, body: &Value) -> Option<AdapterOutput> {
        non_empty_at(body, "/candidates/0/content/parts/0/text").map(AdapterOutput::text)
    }
}
