use serde::Serialize;
use serde_json::Value;

use super::{non_empty_at, to_body, AdapterOutput, ProviderAdapter};
use crate::infrastructure::http_transport::HttpRequest;
use crate::models::{AuthSession, Failure};

pub const HOSTED_TEXT_PATH: &str = "/api/pro-text";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HostedTextBody<'a> {
    prompt: &'a str,
    refresh_token: &'a str,
}

/// 托管代理
///
/// 服务端在访问令牌过期时会用刷新令牌自动续期，并在响应里带回
/// `newAccessToken`；是否持久化由编排层决定。
#[derive(Debug, Clone)]
pub struct HostedProxy {
    url: String,
    access_token: String,
    refresh_token: String,
}

impl HostedProxy {
    pub fn new(base_url: &str, session: &AuthSession) -> Self {
        Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), HOSTED_TEXT_PATH),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        }
    }
}

impl ProviderAdapter for HostedProxy {
    fn name(&self) -> &'static str {
        "hosted-proxy"
    }

    fn build_request(&self, prompt: &str) -> Result<HttpRequest, Failure> {
        let body = HostedTextBody {
            prompt,
            refresh_token: &self.refresh_token,
        };
        Ok(HttpRequest::post(self.url.as_str(), to_body(&body)?).bearer(&self.access_token))
    }

    fn extract(&self, body: &Value) -> Option<AdapterOutput> {
        let text = non_empty_at(body, "/text")?;
        Some(AdapterOutput {
            text,
            rotated_access_token: non_empty_at(body, "/newAccessToken"),
        })
    }
}
