//! 查询请求与结果
//!
//! `QueryResult` 是查询入口唯一的返回形式：成功时携带文本，失败时携带
//! 封闭错误分类 [`ErrorKind`]、对应的标准提示语以及详细说明。

use std::fmt;

use serde::Serialize;

/// 单次查询请求，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    text: String,
    is_mcq: bool,
    is_multiple_choice: bool,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_mcq: false,
            is_multiple_choice: false,
        }
    }

    /// 单选题模式
    pub fn single_choice(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_mcq: true,
            is_multiple_choice: false,
        }
    }

    /// 多选题模式（允许多个正确选项）
    pub fn multiple_choice(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_mcq: true,
            is_multiple_choice: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_mcq(&self) -> bool {
        self.is_mcq
    }

    pub fn is_multiple_choice(&self) -> bool {
        self.is_multiple_choice
    }
}

/// 429 的细分原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RateLimitReason {
    TokenLimit,
    DailyLimit,
    ConcurrentConflict,
    Generic,
}

/// 403 的细分原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ForbiddenReason {
    /// 订阅缺失或已过期，托管代理路径会自动登出
    Subscription,
    AccessDenied,
}

/// 传输失败的细分原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkReason {
    Connect,
    Timeout,
    Other,
}

/// 封闭的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum ErrorKind {
    Auth,
    Forbidden(ForbiddenReason),
    RateLimit(RateLimitReason),
    Server,
    Client,
    Network(NetworkReason),
    Parse,
    Config,
    General,
}

impl ErrorKind {
    /// 每个分类唯一的标准提示语
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Auth => {
                "Authentication required. Configure an API key or log in again."
            }
            ErrorKind::Forbidden(ForbiddenReason::Subscription) => {
                "Subscription required or expired."
            }
            ErrorKind::Forbidden(ForbiddenReason::AccessDenied) => {
                "Access denied. Please check your account status."
            }
            ErrorKind::RateLimit(RateLimitReason::TokenLimit) => {
                "Token limit exceeded. Please upgrade or wait for your limit to reset."
            }
            ErrorKind::RateLimit(RateLimitReason::DailyLimit) => {
                "Daily request limit exceeded. Please try again tomorrow."
            }
            ErrorKind::RateLimit(RateLimitReason::ConcurrentConflict) => {
                "Please wait for your previous request to complete."
            }
            ErrorKind::RateLimit(RateLimitReason::Generic) => {
                "Too many requests. Please wait before trying again."
            }
            ErrorKind::Server => {
                "Service temporarily unavailable. Please try again in a moment."
            }
            ErrorKind::Client => "Invalid request. Please try rephrasing your question.",
            ErrorKind::Network(NetworkReason::Connect) => {
                "Unable to connect to the service. Please try again."
            }
            ErrorKind::Network(NetworkReason::Timeout) => "Request timed out. Please try again.",
            ErrorKind::Network(NetworkReason::Other) => {
                "Network error. Please check your connection and try again."
            }
            ErrorKind::Parse => "Invalid API response format.",
            ErrorKind::Config => "AI provider is not configured correctly.",
            ErrorKind::General => "An unexpected error occurred. Please try again.",
        }
    }

    /// 托管代理路径上是否需要清除登录会话
    pub fn forces_logout(self) -> bool {
        matches!(
            self,
            ErrorKind::Auth | ErrorKind::Forbidden(ForbiddenReason::Subscription)
        )
    }
}

/// 失败结果，`message` 与 `detail` 保证非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let message = kind.message().to_string();
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            message.clone()
        } else {
            detail
        };
        Self {
            kind,
            message,
            detail,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.detail)
    }
}

impl std::error::Error for Failure {}

/// 查询结果，两个分支恰有一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Success { text: String },
    Failure(Failure),
}

impl QueryResult {
    pub fn success(text: impl Into<String>) -> Self {
        QueryResult::Success { text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            QueryResult::Success { text } => Some(text),
            QueryResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            QueryResult::Success { .. } => None,
            QueryResult::Failure(f) => Some(f),
        }
    }

    pub fn into_result(self) -> Result<String, Failure> {
        match self {
            QueryResult::Success { text } => Ok(text),
            QueryResult::Failure(f) => Err(f),
        }
    }
}

impl From<Failure> for QueryResult {
    fn from(failure: Failure) -> Self {
        QueryResult::Failure(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_detail_falls_back_to_message() {
        let failure = Failure::new(ErrorKind::Server, "   ");
        assert_eq!(failure.detail, ErrorKind::Server.message());
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn test_forces_logout_only_for_session_failures() {
        assert!(ErrorKind::Auth.forces_logout());
        assert!(ErrorKind::Forbidden(ForbiddenReason::Subscription).forces_logout());
        assert!(!ErrorKind::Forbidden(ForbiddenReason::AccessDenied).forces_logout());
        assert!(!ErrorKind::RateLimit(RateLimitReason::Generic).forces_logout());
    }

    #[test]
    fn test_request_modes() {
        let req = QueryRequest::multiple_choice("Pick all primes: A.2 B.4 C.5");
        assert!(req.is_mcq());
        assert!(req.is_multiple_choice());

        let req = QueryRequest::new("Explain borrowing");
        assert!(!req.is_mcq());
    }
}
