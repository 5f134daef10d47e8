//! # LLM Relay
//!
//! 把一段文本（可选按单选/多选题处理）转发给大模型服务商，并返回回答或分类后的失败原因
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享资源，只暴露能力
//! - `RequestGate` - 进程内单飞闸门，超时自动释放
//! - `SettingsStore` - 键值设置存储（内存 / TOML 文件）
//! - `HttpTransport` - 发送 JSON POST 请求
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ProviderConfigStore` - 解析当前生效的服务商，管理登录会话
//! - `providers` - 各服务商的请求构建与响应提取
//! - `error_classifier` - 把 HTTP / 网络失败归类为稳定的错误种类
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次查询"的完整处理流程
//! - `QueryCtx` - 日志上下文（序号 + 后端）
//! - `QueryOrchestrator` - 闸门 → 解析 → 请求 → 分类 → 会话副作用
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用装配与命令行入口
//! - `orchestrator/session_sweeper` - 会话过期巡检
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{HttpTransport, MemoryStore, RequestGate, SettingsStore, TomlFileStore};
pub use models::{ErrorKind, Failure, Provider, ProviderConfig, QueryRequest, QueryResult};
pub use orchestrator::App;
pub use services::ProviderConfigStore;
pub use workflow::{QueryCtx, QueryOrchestrator};
