//! 错误分类 - 业务能力层
//!
//! 把各服务商五花八门的失败响应收敛到封闭的 [`ErrorKind`] 集合。
//! 单次遍历，第一条命中的规则生效：
//!
//! 1. 401，或 403 且响应体像是凭据失效 → `auth`
//! 2. 403 且提到订阅/过期 → `forbidden(subscription)`，其余 403 → `forbidden(accessDenied)`
//! 3. 429 → `rateLimit`，再按响应体细分
//! 4. 500 → `server`
//! 5. 400 → `client`
//! 6. 其他非 2xx 或响应体无法解析 → `general`，详情中带状态码
//! 7. 没有响应（传输层失败）→ `network`

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{TransportError, TransportErrorKind};
use crate::models::{ErrorKind, Failure, ForbiddenReason, NetworkReason, RateLimitReason};

static CREDENTIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)unauthori[sz]ed|authentication|invalid[ _-]?(x-)?api[ _-]?key|(invalid|expired|revoked)\s+(access\s+|refresh\s+)?(token|credentials?|session)|(token|session)\s+(has\s+)?expired",
    )
    .expect("credential pattern is valid")
});

static SUBSCRIPTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)subscription|expired").expect("subscription pattern is valid"));

static TIMEOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)time[ d-]?out|timed out").expect("timeout pattern is valid"));

static CONNECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fetch|connect|dns|unreachable").expect("connect pattern is valid")
});

/// 429 响应中可能携带的用量信息
#[derive(Debug, Deserialize)]
struct UsageDetails {
    used: Option<u64>,
    limit: Option<u64>,
    remaining: Option<u64>,
}

/// 错误响应体中的文本字段，兼容 `{error: "..."}` 与 `{error: {message: "..."}}` 两种形态
fn text_fields(body: &Value) -> (Option<String>, Option<String>) {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    let error = match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    (message, error)
}

/// 对失败的 HTTP 响应分类
pub fn classify_http(status: u16, body: &str) -> Failure {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    debug!("分类 HTTP {} 失败响应 (可解析: {})", status, parsed.is_some());

    if status == 401 {
        let detail = parsed
            .as_ref()
            .and_then(|v| {
                let (message, error) = text_fields(v);
                message.or(error)
            })
            .map(|m| format!("Credentials were rejected: {}", m))
            .unwrap_or_else(|| {
                "Your session has expired or the API key is invalid. Please log in again or check your API key.".to_string()
            });
        return Failure::new(ErrorKind::Auth, detail);
    }

    let Some(parsed) = parsed else {
        return Failure::new(
            ErrorKind::General,
            format!("HTTP {}: Unable to parse error details", status),
        );
    };

    let (message, error) = text_fields(&parsed);
    let haystack = match (&message, &error) {
        (None, None) => parsed.to_string(),
        _ => format!(
            "{} {}",
            message.as_deref().unwrap_or_default(),
            error.as_deref().unwrap_or_default()
        ),
    };
    let lower = haystack.to_lowercase();

    match status {
        403 => classify_forbidden(&haystack),
        429 => classify_rate_limit(&lower, &parsed),
        500 => Failure::new(
            ErrorKind::Server,
            "The server encountered an internal error. This is usually temporary and should resolve shortly.",
        ),
        400 => Failure::new(
            ErrorKind::Client,
            "The request format was invalid. Try shortening your text or rephrasing your question.",
        ),
        _ => {
            let summary = message
                .or(error)
                .unwrap_or_else(|| format!("Server error ({})", status));
            Failure::new(ErrorKind::General, format!("HTTP {}: {}", status, summary))
        }
    }
}

fn classify_forbidden(haystack: &str) -> Failure {
    let mentions_subscription = haystack.to_lowercase().contains("subscription");

    if CREDENTIAL_PATTERN.is_match(haystack) && !mentions_subscription {
        return Failure::new(
            ErrorKind::Auth,
            "Your session has expired. Please log in again to continue.",
        );
    }

    if SUBSCRIPTION_PATTERN.is_match(haystack) {
        return Failure::new(
            ErrorKind::Forbidden(ForbiddenReason::Subscription),
            "This service requires an active subscription. Please upgrade or renew your subscription.",
        );
    }

    Failure::new(
        ErrorKind::Forbidden(ForbiddenReason::AccessDenied),
        "Your request was denied. This may be due to account restrictions or service limitations.",
    )
}

fn classify_rate_limit(lower: &str, body: &Value) -> Failure {
    if lower.contains("token limit exceeded") {
        let usage = body
            .get("details")
            .cloned()
            .and_then(|d| serde_json::from_value::<UsageDetails>(d).ok());
        let detail = match usage {
            Some(UsageDetails {
                used: Some(used),
                limit: Some(limit),
                remaining,
            }) => format!(
                "You have used {} out of {} tokens. {} tokens remaining.",
                used,
                limit,
                remaining.unwrap_or_else(|| limit.saturating_sub(used))
            ),
            _ => "You have reached your token limit for this billing period.".to_string(),
        };
        return Failure::new(ErrorKind::RateLimit(RateLimitReason::TokenLimit), detail);
    }

    if lower.contains("daily request limit exceeded") {
        let reset = body.get("nextReset").and_then(parse_reset);
        let detail = match reset {
            Some(at) => format!(
                "You have reached your daily request limit. Limit resets at {}.",
                at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "You have reached your daily request limit. Limit resets daily at midnight UTC."
                .to_string(),
        };
        return Failure::new(ErrorKind::RateLimit(RateLimitReason::DailyLimit), detail);
    }

    if lower.contains("wait for your previous request") {
        return concurrent_conflict();
    }

    Failure::new(
        ErrorKind::RateLimit(RateLimitReason::Generic),
        "Rate limit exceeded. Please wait a few moments before making another request.",
    )
}

fn parse_reset(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// 对没有拿到响应的传输失败分类
pub fn classify_transport(err: &TransportError) -> Failure {
    let timed_out =
        err.kind == TransportErrorKind::Timeout || TIMEOUT_PATTERN.is_match(&err.message);
    if timed_out {
        return Failure::new(
            ErrorKind::Network(NetworkReason::Timeout),
            "The request took too long to complete. This may be due to high server load.",
        );
    }

    let connect_failed =
        err.kind == TransportErrorKind::Connect || CONNECT_PATTERN.is_match(&err.message);
    if connect_failed {
        return Failure::new(
            ErrorKind::Network(NetworkReason::Connect),
            "Network connection failed. Please check your internet connection and try again.",
        );
    }

    Failure::new(ErrorKind::Network(NetworkReason::Other), err.message.clone())
}

/// 本地闸门拒绝时的失败（与服务端返回的并发冲突同一分类）
pub fn concurrent_conflict() -> Failure {
    Failure::new(
        ErrorKind::RateLimit(RateLimitReason::ConcurrentConflict),
        "Multiple simultaneous requests are not allowed. Please wait a moment before trying again.",
    )
}
