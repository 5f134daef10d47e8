//! 服务商配置解析 - 业务能力层
//!
//! 每次查询开始时从持久化设置中确定唯一的后端：
//! 1. `useCustomAPI` 为真且 API Key 非空 → 直连服务商
//! 2. 存在未过期的登录会话 → 托管代理
//! 3. 否则 → `auth` 失败
//!
//! 解析本身是纯读取；会话的登录、登出、令牌轮换和过期清理也在这里，
//! 但只由编排层或外部登录流程显式调用。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::infrastructure::settings_store::{keys, SettingsStore};
use crate::models::{
    AuthSession, ErrorKind, Failure, Provider, ProviderConfig, ResolvedProvider,
};

/// 默认会话有效期
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 12;

#[derive(Clone)]
pub struct ProviderConfigStore {
    store: Arc<dyn SettingsStore>,
    session_lifetime: Duration,
}

impl ProviderConfigStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            session_lifetime: Duration::hours(DEFAULT_SESSION_LIFETIME_HOURS),
        }
    }

    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    pub fn resolve(&self) -> Result<ResolvedProvider, Failure> {
        self.resolve_at(Utc::now())
    }

    pub fn resolve_at(&self, now: DateTime<Utc>) -> Result<ResolvedProvider, Failure> {
        let api_key = self
            .store
            .get_str(keys::CUSTOM_API_KEY)
            .unwrap_or_default();

        if self.store.get_bool(keys::USE_CUSTOM_API) && !api_key.trim().is_empty() {
            return self.direct_config(api_key).map(ResolvedProvider::Direct);
        }

        match self.session() {
            Some(session) if !session.is_expired(now, self.session_lifetime) => {
                Ok(ResolvedProvider::HostedProxy(session))
            }
            Some(_) => {
                debug!("登录会话已超过有效期，视为未登录");
                Err(no_credentials())
            }
            None => Err(no_credentials()),
        }
    }

    fn direct_config(&self, api_key: String) -> Result<ProviderConfig, Failure> {
        let provider_id = self
            .store
            .get_str(keys::AI_PROVIDER)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Provider::OpenAi.as_str().to_string());

        let provider: Provider = provider_id.parse().map_err(|e| {
            Failure::new(
                ErrorKind::Config,
                format!("The selected AI provider is not supported: {}", e),
            )
        })?;

        let endpoint = self
            .store
            .get_str(keys::CUSTOM_ENDPOINT)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if provider == Provider::Custom && endpoint.is_none() {
            return Err(Failure::new(
                ErrorKind::Config,
                "Custom endpoint not configured. Please set a custom API endpoint in the settings.",
            ));
        }

        let model_name = self
            .store
            .get_str(keys::CUSTOM_MODEL_NAME)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(ProviderConfig {
            use_custom_api: true,
            provider,
            endpoint,
            api_key,
            model_name: Some(model_name),
        })
    }

    /// 读取登录会话；两个令牌缺一不可
    pub fn session(&self) -> Option<AuthSession> {
        let access_token = self
            .store
            .get_str(keys::ACCESS_TOKEN)
            .filter(|s| !s.is_empty())?;
        let refresh_token = self
            .store
            .get_str(keys::REFRESH_TOKEN)
            .filter(|s| !s.is_empty())?;

        Some(AuthSession {
            access_token,
            refresh_token,
            is_pro: self.store.get_bool(keys::IS_PRO),
            login_timestamp: self.store.get(keys::LOGIN_TIMESTAMP).and_then(parse_timestamp),
        })
    }

    /// 保存新的登录会话
    pub fn login(&self, session: &AuthSession) -> Result<(), StoreError> {
        self.store
            .set(keys::ACCESS_TOKEN, json!(session.access_token))?;
        self.store
            .set(keys::REFRESH_TOKEN, json!(session.refresh_token))?;
        self.store.set(keys::IS_PRO, json!(session.is_pro))?;
        self.store.set(keys::LOGGED_IN, json!(true))?;
        let login_at = session.login_timestamp.unwrap_or_else(Utc::now);
        self.store
            .set(keys::LOGIN_TIMESTAMP, json!(login_at.timestamp_millis()))?;
        info!("🔑 已保存登录会话");
        Ok(())
    }

    /// 清除登录会话
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.remove(keys::SESSION_KEYS)?;
        info!("🔒 已清除登录会话");
        Ok(())
    }

    /// 持久化服务端轮换的访问令牌（刷新令牌保持不变）
    pub fn persist_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(keys::ACCESS_TOKEN, json!(token))?;
        info!("✅ 访问令牌已由服务端刷新并保存");
        Ok(())
    }

    /// 会话超过有效期时清除会话及直连服务商设置，返回是否执行了清理
    pub fn expire_stale_session(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let logged_in = self.store.get_bool(keys::LOGGED_IN);
        let login_at = self.store.get(keys::LOGIN_TIMESTAMP).and_then(parse_timestamp);

        match login_at {
            Some(at) if logged_in && now - at > self.session_lifetime => {
                info!(
                    "⏰ 会话已超过 {} 小时有效期，自动登出",
                    self.session_lifetime.num_hours()
                );
                self.store.remove(keys::SESSION_KEYS)?;
                self.store.remove(keys::DIRECT_PROVIDER_KEYS)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn no_credentials() -> Failure {
    Failure::new(
        ErrorKind::Auth,
        "No credentials configured. Provide your own API key in the settings or log in to use the hosted service.",
    )
}

/// 登录时间：毫秒时间戳或 RFC 3339 字符串
fn parse_timestamp(value: Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
