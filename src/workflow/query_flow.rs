//! 查询流程 - 流程层
//!
//! 核心职责：定义"一次查询"的完整处理流程
//!
//! 流程顺序：
//! 1. 占用请求闸门（失败 → 立即返回 rateLimit，不发请求）
//! 2. 解析服务商配置（失败 → auth / config）
//! 3. 构建提示词并经适配器发出请求
//! 4. 成功：托管代理路径持久化轮换的访问令牌
//! 5. 失败：分类；托管代理路径上的会话类失败会清除登录状态
//! 6. 无论如何释放闸门
//!
//! 不自动重试，所有失败都以 `QueryResult::Failure` 返回给调用方。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::infrastructure::http_transport::HttpTransport;
use crate::infrastructure::request_gate::RequestGate;
use crate::infrastructure::settings_store::SettingsStore;
use crate::models::{
    ErrorKind, Failure, ProviderConfig, QueryRequest, QueryResult, ResolvedProvider,
};
use crate::services::error_classifier::{classify_http, classify_transport, concurrent_conflict};
use crate::services::prompt;
use crate::services::provider_config_store::ProviderConfigStore;
use crate::services::providers::{self, adapter_for, CallError};
use crate::utils::logging::truncate_text;
use crate::workflow::query_ctx::QueryCtx;

/// 查询编排器
///
/// - 唯一的公开查询入口
/// - 组合请求闸门、配置解析、服务商适配与错误分类
/// - 会话相关的副作用（令牌轮换、强制登出）只发生在这里
pub struct QueryOrchestrator<T: HttpTransport> {
    gate: RequestGate,
    config_store: ProviderConfigStore,
    transport: T,
    hosted_base_url: String,
    sequence: AtomicU64,
}

impl<T: HttpTransport> QueryOrchestrator<T> {
    pub fn new(
        gate: RequestGate,
        config_store: ProviderConfigStore,
        transport: T,
        hosted_base_url: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            config_store,
            transport,
            hosted_base_url: hosted_base_url.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// 按程序配置创建编排器
    pub fn from_config(config: &Config, settings: Arc<dyn SettingsStore>, transport: T) -> Self {
        let config_store =
            ProviderConfigStore::new(settings).with_session_lifetime(config.session_lifetime());
        Self::new(
            RequestGate::new(config.gate_timeout()),
            config_store,
            transport,
            config.hosted_api_base_url.clone(),
        )
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn config_store(&self) -> &ProviderConfigStore {
        &self.config_store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 发起一次查询
    pub async fn query(&self, request: QueryRequest) -> QueryResult {
        let Some(permit) = self.gate.try_acquire() else {
            info!("⏳ 上一个请求尚未完成，本次请求被拒绝");
            return concurrent_conflict().into();
        };

        let result = match self.config_store.resolve() {
            Ok(resolved) => {
                let prompt = prompt::augment(&request);
                self.dispatch_guarded(&resolved, &prompt).await
            }
            Err(failure) => {
                warn!("⚠️ 无可用的服务商配置: {}", failure.detail);
                failure.into()
            }
        };

        permit.release();
        result
    }

    /// 以布尔开关描述题型的便捷入口
    pub async fn ask(&self, text: &str, is_mcq: bool, is_multiple_choice: bool) -> QueryResult {
        let request = match (is_mcq, is_multiple_choice) {
            (false, _) => QueryRequest::new(text),
            (true, false) => QueryRequest::single_choice(text),
            (true, true) => QueryRequest::multiple_choice(text),
        };
        self.query(request).await
    }

    /// 带可选上下文的对话，走同一条受闸门保护的路径
    pub async fn chat(&self, message: &str, context: Option<&str>) -> QueryResult {
        self.query(QueryRequest::new(prompt::chat_prompt(message, context)))
            .await
    }

    /// 用固定提示词探测一个直连服务商配置是否可用
    pub async fn test_connection(&self, config: &ProviderConfig) -> Result<(), Failure> {
        let Some(permit) = self.gate.try_acquire() else {
            return Err(concurrent_conflict());
        };

        let resolved = ResolvedProvider::Direct(config.clone());
        let result = self
            .dispatch_guarded(&resolved, prompt::CONNECTION_TEST_PROMPT)
            .await;
        permit.release();

        match result {
            QueryResult::Success { .. } => {
                info!("✅ 服务商 {} 连接测试成功", config.provider);
                Ok(())
            }
            QueryResult::Failure(failure) => {
                warn!("❌ 服务商 {} 连接测试失败: {}", config.provider, failure);
                Err(failure)
            }
        }
    }

    /// 把调度过程中的 panic 也收敛为失败结果
    async fn dispatch_guarded(&self, resolved: &ResolvedProvider, prompt: &str) -> QueryResult {
        match AssertUnwindSafe(self.dispatch(resolved, prompt))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!("💥 查询过程中出现未预期的错误: {}", detail);
                Failure::new(ErrorKind::General, detail).into()
            }
        }
    }

    async fn dispatch(&self, resolved: &ResolvedProvider, prompt: &str) -> QueryResult {
        let ctx = QueryCtx::new(
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            resolved.label(),
        );
        info!("{} 🤖 发送查询: {}", ctx, truncate_text(prompt, 60));

        let adapter = adapter_for(resolved, &self.hosted_base_url);
        match providers::call(adapter.as_ref(), &self.transport, prompt).await {
            Ok(output) => {
                if let (true, Some(token)) = (resolved.is_hosted(), output.rotated_access_token) {
                    if let Err(e) = self.config_store.persist_access_token(&token) {
                        warn!("{} 保存刷新后的访问令牌失败: {}", ctx, e);
                    }
                }
                info!("{} ✓ 查询成功，响应长度: {} 字符", ctx, output.text.len());
                QueryResult::success(output.text)
            }
            Err(CallError::Build(failure)) => {
                warn!("{} ⚠️ 请求构建失败: {}", ctx, failure.detail);
                failure.into()
            }
            Err(CallError::Http { status, body }) => {
                let failure = classify_http(status, &body);
                warn!("{} ⚠️ HTTP {} → {:?}", ctx, status, failure.kind);
                if resolved.is_hosted() && failure.kind.forces_logout() {
                    info!("{} 🔒 会话不可恢复，自动登出", ctx);
                    if let Err(e) = self.config_store.logout() {
                        warn!("{} 清除登录会话失败: {}", ctx, e);
                    }
                }
                failure.into()
            }
            Err(CallError::Transport(e)) => {
                warn!("{} ⚠️ 网络请求失败: {}", ctx, e);
                classify_transport(&e).into()
            }
            Err(CallError::Parse(detail)) => {
                debug!("{} 响应格式无法识别: {}", ctx, detail);
                Failure::new(ErrorKind::Parse, detail).into()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Failed to process the request.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::infrastructure::http_transport::{HttpRequest, HttpResponse};
    use crate::infrastructure::settings_store::{keys, MemoryStore};
    use crate::models::{AuthSession, Provider};
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedTransport {
        response: HttpResponse,
        calls: Mutex<usize>,
    }

    impl FixedTransport {
        fn new(status: u16, body: serde_json::Value) -> Self {
            Self {
                response: HttpResponse::new(status, body.to_string()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl HttpTransport for FixedTransport {
        async fn post_json(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.response.clone())
        }
    }

    struct PanickingTransport;

    impl HttpTransport for PanickingTransport {
        async fn post_json(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            panic!("transport exploded")
        }
    }

    fn build<T: HttpTransport>(transport: T) -> (QueryOrchestrator<T>, Arc<MemoryStore>) {
        let settings = Arc::new(MemoryStore::new());
        let orchestrator = QueryOrchestrator::new(
            RequestGate::default(),
            ProviderConfigStore::new(settings.clone()),
            transport,
            "https://relay.test",
        );
        (orchestrator, settings)
    }

    fn use_openai(settings: &MemoryStore) {
        settings.set(keys::USE_CUSTOM_API, json!(true)).unwrap();
        settings.set(keys::AI_PROVIDER, json!("openai")).unwrap();
        settings.set(keys::CUSTOM_API_KEY, json!("sk")).unwrap();
    }

    #[tokio::test]
    async fn test_no_credentials_makes_no_network_call() {
        let (orchestrator, _settings) = build(FixedTransport::new(200, json!({})));

        let result = orchestrator.query(QueryRequest::new("hi")).await;
        assert_eq!(result.failure().unwrap().kind, ErrorKind::Auth);
        assert_eq!(orchestrator.transport.calls(), 0);
        assert!(orchestrator.gate().can_make_request());
    }

    #[tokio::test]
    async fn test_rotated_token_is_persisted() {
        let (orchestrator, settings) = build(FixedTransport::new(
            200,
            json!({"text": "ok", "newAccessToken": "at-2"}),
        ));
        orchestrator
            .config_store()
            .login(&AuthSession::new("at-1", "rt"))
            .unwrap();

        let result = orchestrator.query(QueryRequest::new("hi")).await;
        assert_eq!(result.text(), Some("ok"));
        assert_eq!(settings.get_str(keys::ACCESS_TOKEN).as_deref(), Some("at-2"));
        assert_eq!(settings.get_str(keys::REFRESH_TOKEN).as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn test_direct_auth_failure_keeps_session() {
        let (orchestrator, settings) =
            build(FixedTransport::new(401, json!({"error": {"message": "bad key"}})));
        orchestrator
            .config_store()
            .login(&AuthSession::new("at", "rt"))
            .unwrap();
        use_openai(&settings);

        let result = orchestrator.query(QueryRequest::new("hi")).await;
        assert_eq!(result.failure().unwrap().kind, ErrorKind::Auth);
        assert!(orchestrator.config_store().session().is_some());
    }

    #[tokio::test]
    async fn test_hosted_auth_failure_clears_session() {
        let (orchestrator, settings) =
            build(FixedTransport::new(401, json!({"error": "Invalid access token"})));
        orchestrator
            .config_store()
            .login(&AuthSession::new("at", "rt"))
            .unwrap();
        assert!(orchestrator.config_store().resolve().unwrap().is_hosted());

        let result = orchestrator.query(QueryRequest::new("hi")).await;
        assert_eq!(result.failure().unwrap().kind, ErrorKind::Auth);
        assert_eq!(orchestrator.transport.calls(), 1);
        assert!(orchestrator.config_store().session().is_none());
        assert!(settings.get(keys::REFRESH_TOKEN).is_none());
        assert_eq!(
            orchestrator.config_store().resolve().unwrap_err().kind,
            ErrorKind::Auth
        );
        assert!(orchestrator.gate().can_make_request());
    }

    #[tokio::test]
    async fn test_panic_in_transport_becomes_general_failure() {
        let (orchestrator, settings) = build(PanickingTransport);
        use_openai(&settings);

        let result = orchestrator.query(QueryRequest::new("hi")).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::General);
        assert_eq!(failure.detail, "transport exploded");
        assert!(orchestrator.gate().can_make_request());
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let (orchestrator, _settings) = build(FixedTransport::new(
            200,
            json!({"content": [{"text": "API connection successful!"}]}),
        ));
        let config = ProviderConfig::new(Provider::Anthropic, "ak");
        assert!(orchestrator.test_connection(&config).await.is_ok());

        let (orchestrator, _settings) = build(FixedTransport::new(500, json!({})));
        let failure = orchestrator.test_connection(&config).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_chat_includes_context() {
        let (orchestrator, settings) = build(FixedTransport::new(
            200,
            json!({"choices": [{"message": {"content": "sure"}}]}),
        ));
        use_openai(&settings);

        let result = orchestrator.chat("explain", Some("ownership")).await;
        assert_eq!(result.text(), Some("sure"));
    }
}
