//! 会话过期巡检
//!
//! 周期性检查登录会话是否超过有效期，过期则自动登出。

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::services::provider_config_store::ProviderConfigStore;

/// 启动后台巡检任务，首次检查立即执行
pub fn spawn_session_sweeper(config_store: ProviderConfigStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match config_store.expire_stale_session(Utc::now()) {
                Ok(true) => debug!("会话巡检：已清除过期会话"),
                Ok(false) => {}
                Err(e) => warn!("会话巡检失败: {}", e),
            }
        }
    })
}
