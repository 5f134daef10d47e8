//! 查询上下文
//!
//! 封装"这是第几次查询、走的哪个后端"这一信息，只用于日志

use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct QueryCtx {
    /// 进程内递增的查询序号
    pub sequence: u64,

    /// 后端名称
    pub backend: &'static str,
}

impl QueryCtx {
    pub fn new(sequence: u64, backend: &'static str) -> Self {
        Self { sequence, backend }
    }
}

impl Display for QueryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[查询 #{} 后端 {}]", self.sequence, self.backend)
    }
}
