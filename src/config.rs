use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 托管代理服务的基础 URL
    pub hosted_api_base_url: String,
    /// 设置文件路径（TOML）
    pub settings_path: String,
    /// 请求闸门自动释放时间（秒）
    pub gate_timeout_secs: u64,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 登录会话有效期（小时）
    pub session_lifetime_hours: i64,
    /// 会话过期检查间隔（秒）
    pub session_check_interval_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosted_api_base_url: "http://localhost:8787".to_string(),
            settings_path: "settings.toml".to_string(),
            gate_timeout_secs: 15,
            request_timeout_secs: 60,
            session_lifetime_hours: 12,
            session_check_interval_secs: 300,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            hosted_api_base_url: std::env::var("HOSTED_API_BASE_URL")
                .unwrap_or(default.hosted_api_base_url),
            settings_path: std::env::var("SETTINGS_PATH").unwrap_or(default.settings_path),
            gate_timeout_secs: env_parse("GATE_TIMEOUT_SECS", default.gate_timeout_secs, "u64")?,
            request_timeout_secs: env_parse(
                "REQUEST_TIMEOUT_SECS",
                default.request_timeout_secs,
                "u64",
            )?,
            session_lifetime_hours: env_parse(
                "SESSION_LIFETIME_HOURS",
                default.session_lifetime_hours,
                "i64",
            )?,
            session_check_interval_secs: env_parse(
                "SESSION_CHECK_INTERVAL_SECS",
                default.session_check_interval_secs,
                "u64",
            )?,
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging, "bool")?,
        })
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_lifetime_hours)
    }

    pub fn session_check_interval(&self) -> Duration {
        Duration::from_secs(self.session_check_interval_secs)
    }
}

fn env_parse<T: FromStr>(var_name: &str, default: T, expected_type: &str) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = Config::default();
        assert_eq!(config.gate_timeout(), Duration::from_secs(15));
        assert_eq!(config.session_lifetime(), chrono::Duration::hours(12));
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("LLM_RELAY_TEST_BAD_NUMBER", "fifteen");
        let err = env_parse("LLM_RELAY_TEST_BAD_NUMBER", 15u64, "u64").unwrap_err();
        assert!(err.to_string().contains("LLM_RELAY_TEST_BAD_NUMBER"));
        std::env::remove_var("LLM_RELAY_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_env_parse_falls_back_to_default() {
        let value = env_parse("LLM_RELAY_TEST_UNSET_VAR", 42u64, "u64").unwrap();
        assert_eq!(value, 42);
    }
}
