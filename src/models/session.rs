use chrono::{DateTime, Duration, Utc};

/// 托管代理的登录会话
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub is_pro: bool,
    /// 登录时间；缺失时视为未知，不参与过期判断
    pub login_timestamp: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            is_pro: false,
            login_timestamp: None,
        }
    }

    pub fn logged_in_at(mut self, at: DateTime<Utc>) -> Self {
        self.login_timestamp = Some(at);
        self
    }

    pub fn pro(mut self, is_pro: bool) -> Self {
        self.is_pro = is_pro;
        self
    }

    /// 会话是否已超过有效期
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        self.login_timestamp
            .map(|at| now - at > lifetime)
            .unwrap_or(false)
    }
}
