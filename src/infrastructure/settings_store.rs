//! 设置存储 - 基础设施层
//!
//! 持久化的键值设置，键名保持驼峰风格以兼容已有的设置文件。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

/// 持久化设置的键名
pub mod keys {
    pub const USE_CUSTOM_API: &str = "useCustomAPI";
    pub const AI_PROVIDER: &str = "aiProvider";
    pub const CUSTOM_ENDPOINT: &str = "customEndpoint";
    pub const CUSTOM_API_KEY: &str = "customAPIKey";
    pub const CUSTOM_MODEL_NAME: &str = "customModelName";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const IS_PRO: &str = "isPro";
    pub const LOGIN_TIMESTAMP: &str = "loginTimestamp";
    pub const LOGGED_IN: &str = "loggedIn";
    pub const USERNAME: &str = "username";

    /// 登出时清除的键
    pub const SESSION_KEYS: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        LOGGED_IN,
        USERNAME,
        IS_PRO,
        LOGIN_TIMESTAMP,
    ];

    /// 直连服务商相关的键
    pub const DIRECT_PROVIDER_KEYS: &[&str] = &[
        USE_CUSTOM_API,
        AI_PROVIDER,
        CUSTOM_ENDPOINT,
        CUSTOM_API_KEY,
        CUSTOM_MODEL_NAME,
    ];
}

/// 键值设置存储
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut values = self.lock();
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}

/// TOML 文件存储
///
/// 启动时整体载入，每次写入后整体落盘。
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl TomlFileStore {
    /// 打开设置文件，文件不存在时以空设置开始
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values: BTreeMap<String, Value> = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| {
                StoreError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            toml::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        debug!("已载入设置文件 {} ({} 项)", path.display(), values.len());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let content = toml::to_string(values)?;
        std::fs::write(&self.path, content).map_err(|source| StoreError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl SettingsStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.lock();
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut values = self.lock();
        for key in keys {
            values.remove(*key);
        }
        self.flush(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_typed_getters() {
        let store = MemoryStore::new();
        store.set(keys::USE_CUSTOM_API, json!(true)).unwrap();
        store.set(keys::AI_PROVIDER, json!("google")).unwrap();

        assert!(store.get_bool(keys::USE_CUSTOM_API));
        assert!(!store.get_bool(keys::IS_PRO));
        assert_eq!(store.get_str(keys::AI_PROVIDER).as_deref(), Some("google"));

        store.remove(&[keys::AI_PROVIDER]).unwrap();
        assert!(store.get(keys::AI_PROVIDER).is_none());
    }

    #[test]
    fn test_toml_store_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!(
            "llm_relay_settings_{}.toml",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let store = TomlFileStore::open(&path).unwrap();
            store.set(keys::ACCESS_TOKEN, json!("at-1")).unwrap();
            store.set(keys::IS_PRO, json!(true)).unwrap();
            store.set(keys::LOGIN_TIMESTAMP, json!(1_700_000_000_000i64)).unwrap();
        }

        let reopened = TomlFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_str(keys::ACCESS_TOKEN).as_deref(), Some("at-1"));
        assert!(reopened.get_bool(keys::IS_PRO));
        assert_eq!(
            reopened.get(keys::LOGIN_TIMESTAMP).and_then(|v| v.as_i64()),
            Some(1_700_000_000_000)
        );

        std::fs::remove_file(&path).unwrap();
    }
}
