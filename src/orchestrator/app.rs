//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开设置文件、创建 HTTP 传输层与查询编排器
//! 2. **会话巡检**：后台定期清理过期的登录会话
//! 3. **单次查询**：解析命令行参数，执行一次查询并输出结果
//!
//! 编排层只做装配与输出，不做任何错误分类或服务商判断。

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::http_transport::ReqwestTransport;
use crate::infrastructure::settings_store::{SettingsStore, TomlFileStore};
use crate::models::{QueryRequest, QueryResult};
use crate::orchestrator::session_sweeper::spawn_session_sweeper;
use crate::utils::logging::log_startup;
use crate::workflow::QueryOrchestrator;

/// 命令行参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub text: String,
    pub is_mcq: bool,
    pub is_multiple_choice: bool,
    pub context: Option<String>,
}

impl CliArgs {
    /// 解析参数（不含程序名）
    ///
    /// - `--mcq`：按单选题处理
    /// - `--multi`：按多选题处理（隐含 `--mcq`）
    /// - `--context <文本>`：以对话模式附带上下文
    /// - 其余参数用空格拼接为查询文本
    pub fn parse_from<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        let mut words = Vec::new();
        let mut iter = args.into_iter().map(Into::into);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--mcq" => parsed.is_mcq = true,
                "--multi" => {
                    parsed.is_mcq = true;
                    parsed.is_multiple_choice = true;
                }
                "--context" => match iter.next() {
                    Some(context) => parsed.context = Some(context),
                    None => bail!("--context 需要一个参数"),
                },
                _ => words.push(arg),
            }
        }

        parsed.text = words.join(" ");
        if parsed.text.trim().is_empty() {
            bail!("用法: llm_relay [--mcq | --multi] [--context <文本>] <查询文本>");
        }
        if parsed.context.is_some() && parsed.is_mcq {
            bail!("--context 不能与 --mcq / --multi 同时使用");
        }
        Ok(parsed)
    }

    fn into_request(self) -> QueryRequest {
        match (self.is_mcq, self.is_multiple_choice) {
            (false, _) => QueryRequest::new(self.text),
            (true, false) => QueryRequest::single_choice(self.text),
            (true, true) => QueryRequest::multiple_choice(self.text),
        }
    }
}

/// 按配置装配查询编排器：设置文件 + HTTP 传输层
pub fn build_orchestrator(config: &Config) -> AppResult<QueryOrchestrator<ReqwestTransport>> {
    let settings: Arc<dyn SettingsStore> = Arc::new(TomlFileStore::open(&config.settings_path)?);
    let transport = ReqwestTransport::new(config.request_timeout())?;
    Ok(QueryOrchestrator::from_config(config, settings, transport))
}

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: Arc<QueryOrchestrator<ReqwestTransport>>,
    sweeper: JoinHandle<()>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let orchestrator = build_orchestrator(&config)
            .with_context(|| format!("初始化失败 (设置文件 {})", config.settings_path))?;
        let orchestrator = Arc::new(orchestrator);

        let backend = match orchestrator.config_store().resolve() {
            Ok(resolved) => resolved.label(),
            Err(_) => "未配置",
        };
        log_startup(backend, config.gate_timeout_secs);

        let sweeper = spawn_session_sweeper(
            orchestrator.config_store().clone(),
            config.session_check_interval(),
        );

        info!("✓ 设置文件: {}", config.settings_path);
        Ok(Self {
            config,
            orchestrator,
            sweeper,
        })
    }

    pub fn orchestrator(&self) -> &Arc<QueryOrchestrator<ReqwestTransport>> {
        &self.orchestrator
    }

    /// 运行一次查询，结果输出到标准输出
    pub async fn run(self, args: CliArgs) -> Result<()> {
        let result = match args.context.clone() {
            Some(context) => self.orchestrator.chat(&args.text, Some(&context)).await,
            None => self.orchestrator.query(args.into_request()).await,
        };

        self.sweeper.abort();

        match result {
            QueryResult::Success { text } => {
                println!("{}", text);
                Ok(())
            }
            QueryResult::Failure(failure) => {
                warn!(
                    "❌ 查询失败 (后端地址 {}): {:?}",
                    self.config.hosted_api_base_url, failure.kind
                );
                bail!("{}: {}", failure.message, failure.detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, StoreError};

    #[test]
    fn test_parse_plain_query() {
        let args = CliArgs::parse_from(["what", "is", "2+2"]).unwrap();
        assert_eq!(args.text, "what is 2+2");
        assert!(!args.is_mcq);
        assert_eq!(args.context, None);
    }

    #[test]
    fn test_parse_multi_implies_mcq() {
        let args = CliArgs::parse_from(["--multi", "pick", "primes"]).unwrap();
        assert!(args.is_mcq);
        assert!(args.is_multiple_choice);
        assert_eq!(args.into_request(), QueryRequest::multiple_choice("pick primes"));
    }

    #[test]
    fn test_parse_context() {
        let args = CliArgs::parse_from(["--context", "borrowing", "explain"]).unwrap();
        assert_eq!(args.context.as_deref(), Some("borrowing"));
        assert_eq!(args.text, "explain");
    }

    #[test]
    fn test_build_orchestrator_reports_broken_settings_file() {
        let path = std::env::temp_dir().join(format!("llm_relay_app_{}.toml", std::process::id()));
        std::fs::write(&path, "useCustomAPI = [").unwrap();
        let config = Config {
            settings_path: path.display().to_string(),
            ..Config::default()
        };

        let err = build_orchestrator(&config).err().unwrap();
        assert!(matches!(err, AppError::Store(StoreError::Parse { .. })));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_build_orchestrator_with_fresh_settings_file() {
        let path = std::env::temp_dir().join(format!("llm_relay_fresh_{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let config = Config {
            settings_path: path.display().to_string(),
            ..Config::default()
        };

        let orchestrator = build_orchestrator(&config).unwrap();
        assert!(orchestrator.gate().can_make_request());
        assert!(orchestrator.config_store().resolve().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(CliArgs::parse_from(Vec::<String>::new()).is_err());
        assert!(CliArgs::parse_from(["explain", "--context"]).is_err());
        assert!(CliArgs::parse_from(["--mcq", "--context", "c", "q"]).is_err());
    }
}
