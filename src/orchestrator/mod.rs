//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 负责资源装配与生命周期管理，是整个程序的入口。
//!
//! ### `app` - 应用入口
//! - 打开设置文件，创建 HTTP 传输层
//! - 组装查询编排器（QueryOrchestrator）
//! - 解析命令行并执行一次查询
//!
//! ### `session_sweeper` - 会话巡检
//! - 按固定间隔检查登录会话是否过期
//! - 过期即登出，并清除直连服务商的密钥
//!
//! ## 层次关系
//!
//! ```text
//! app (装配 + 输出)
//!     ↓
//! workflow::QueryOrchestrator (单次查询流程)
//!     ↓
//! services (配置解析 / 服务商适配 / 错误分类)
//!     ↓
//! infrastructure (请求闸门 / 设置存储 / HTTP 传输)
//! ```

pub mod app;
pub mod session_sweeper;

pub use app::{build_orchestrator, App, CliArgs};
pub use session_sweeper::spawn_session_sweeper;
