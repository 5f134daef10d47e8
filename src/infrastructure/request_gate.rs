//! 请求闸门 - 基础设施层
//!
//! 持有"正在进行中的查询"这一稀缺资源：同一时刻最多一个查询在途。
//!
//! - 获取失败立即返回，不排队、不重试
//! - 许可（[`GatePermit`]）在所有退出路径上释放，包括 panic 展开
//! - 超过自动释放时间仍未释放的许可视为失效，闸门自愈
//! - 失效许可的迟到释放不会误放后来的持有者

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::infrastructure::clock::{Clock, SystemClock};

/// 默认自动释放时间
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy)]
struct Holder {
    generation: u64,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct GateState {
    holder: Option<Holder>,
    next_generation: u64,
}

struct Inner {
    state: Mutex<GateState>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 清理已过期的持有者，返回当前是否仍被占用
    fn sweep(&self, state: &mut GateState) -> bool {
        match state.holder {
            Some(holder) if self.clock.now() >= holder.deadline => {
                warn!(
                    "⏱️ 请求闸门超过 {:?} 未释放，自动解除占用 (generation={})",
                    self.timeout, holder.generation
                );
                state.holder = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// 单飞请求闸门
///
/// 克隆得到的句柄共享同一状态。
#[derive(Clone)]
pub struct RequestGate {
    inner: Arc<Inner>,
}

impl RequestGate {
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(GateState::default()),
                clock,
                timeout,
            }),
        }
    }

    /// 当前是否允许发起新请求
    pub fn can_make_request(&self) -> bool {
        let mut state = self.inner.lock();
        !self.inner.sweep(&mut state)
    }

    /// 尝试占用闸门；已有请求在途时返回 `None`
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let mut state = self.inner.lock();
        if self.inner.sweep(&mut state) {
            debug!("请求闸门已被占用，拒绝新请求");
            return None;
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        state.holder = Some(Holder {
            generation,
            deadline: self.inner.clock.now() + self.inner.timeout,
        });
        debug!("请求闸门已占用 (generation={})", generation);

        Some(GatePermit {
            inner: Arc::clone(&self.inner),
            generation,
            released: false,
        })
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_TIMEOUT)
    }
}

/// 闸门占用许可，drop 时自动释放
#[must_use = "dropping the permit releases the gate immediately"]
pub struct GatePermit {
    inner: Arc<Inner>,
    generation: u64,
    released: bool,
}

impl GatePermit {
    /// 显式释放，与 drop 等价
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.inner.lock();
        match state.holder {
            Some(holder) if holder.generation == self.generation => {
                state.holder = None;
                debug!("请求闸门已释放 (generation={})", self.generation);
            }
            // 已被自动释放，或已换了新的持有者
            _ => debug!("许可已失效，忽略释放 (generation={})", self.generation),
        }
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.release_inner();
    }
}
