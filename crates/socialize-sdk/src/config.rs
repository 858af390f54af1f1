//! 配置
//!
//! - [`Configuration`]：字符串键值配置（consumer key/secret、第三方 App ID、功能开关）
//! - [`SocializeOptions`]：SDK 自身的类型化选项（默认 bean 路径、销毁等待时长等）

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SocializeError};

/// Socialize consumer key
pub const CONSUMER_KEY: &str = "socialize.consumer.key";
/// Socialize consumer secret
pub const CONSUMER_SECRET: &str = "socialize.consumer.secret";
/// Facebook App ID
pub const FACEBOOK_APP_ID: &str = "facebook.app.id";
/// Twitter consumer key
pub const TWITTER_CONSUMER_KEY: &str = "twitter.consumer.key";
/// Twitter consumer secret
pub const TWITTER_CONSUMER_SECRET: &str = "twitter.consumer.secret";
/// 是否启用推送通知
pub const NOTIFICATIONS_ENABLED: &str = "socialize.notifications.enabled";

/// 默认 bean 配置路径
pub const DEFAULT_BEAN_PATH: &str = "socialize_beans.xml";

/// 键值配置
///
/// 合并（[`Configuration::merge`]）时保留自身已有的值，只从另一份配置补齐缺失的键。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    properties: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 `.properties` 格式文本
    ///
    /// 按 Java properties 规则：`=`、`:` 或空白分隔，支持行尾 `\` 续行与转义。
    pub fn from_properties(text: &str) -> Result<Self> {
        let properties = java_properties::read(text.as_bytes()).map_err(|e| {
            SocializeError::Config(format!("解析 .properties 失败: {}", e))
        })?;
        Ok(Self {
            properties: properties.into_iter().collect(),
        })
    }

    /// 从 JSON 对象解析（`{"key": "value"}`）
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 从 TOML 解析，嵌套表展开为点分键（`[socialize.consumer]` 下的 `key` 即 `socialize.consumer.key`）
    pub fn from_toml(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| SocializeError::Config(format!("解析 TOML 失败: {}", e)))?;

        let mut config = Self::new();
        config.flatten_toml("", &table)?;
        Ok(config)
    }

    fn flatten_toml(&mut self, prefix: &str, table: &toml::Table) -> Result<()> {
        for (name, value) in table {
            let key = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            match value {
                toml::Value::Table(nested) => self.flatten_toml(&key, nested)?,
                toml::Value::String(text) => self.set(key, text.as_str()),
                toml::Value::Integer(n) => self.set(key, n.to_string()),
                toml::Value::Float(n) => self.set(key, n.to_string()),
                toml::Value::Boolean(b) => self.set(key, b.to_string()),
                toml::Value::Datetime(dt) => self.set(key, dt.to_string()),
                toml::Value::Array(_) => {
                    return Err(SocializeError::Config(format!("配置项 {} 不支持数组", key)));
                }
            }
        }
        Ok(())
    }

    /// 读取配置文件，按扩展名选择格式：`.toml`、`.json`，其余按 `.properties` 处理
    pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&text)?,
            Some("json") => Self::from_json(&text)?,
            _ => Self::from_properties(&text)?,
        };
        debug!("已加载配置文件 {}（{} 项）", path.display(), config.len());
        Ok(config)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 读取非空值
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => true,
            Some(v) if v == "false" || v == "0" || v == "no" => false,
            _ => default,
        }
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 用 `fallback` 补齐缺失的键，已有的值保持不变
    pub fn merge(&mut self, fallback: &Configuration) {
        for (key, value) in &fallback.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// 覆盖式写入另一份配置的全部键值
    pub fn extend(&mut self, other: &Configuration) {
        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    pub fn consumer_key(&self) -> Option<&str> {
        self.get_non_empty(CONSUMER_KEY)
    }

    pub fn consumer_secret(&self) -> Option<&str> {
        self.get_non_empty(CONSUMER_SECRET)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.get_bool(NOTIFICATIONS_ENABLED, false)
    }
}

/// Socialize SDK 选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocializeOptions {
    /// `initialize(ctx)` 未指定路径时使用的 bean 配置
    pub default_bean_paths: Vec<String>,
    /// 销毁时等待后台任务结束的上限（毫秒）
    pub teardown_timeout_ms: u64,
    /// 调试模式
    pub debug_mode: bool,
    /// 外部设置的配置，初始化时与容器配置合并（容器优先）
    pub properties: Configuration,
    /// 可选的配置文件（`.properties` / `.toml` / `.json`），`SocializeOptions::load` 时读取
    pub properties_file: Option<PathBuf>,
}

impl Default for SocializeOptions {
    fn default() -> Self {
        Self {
            default_bean_paths: vec![DEFAULT_BEAN_PATH.to_string()],
            teardown_timeout_ms: 10_000,
            debug_mode: false,
            properties: Configuration::default(),
            properties_file: None,
        }
    }
}

impl SocializeOptions {
    pub fn builder() -> SocializeOptionsBuilder {
        SocializeOptionsBuilder::new()
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    /// 读取 `properties_file`（如有），文件中的值不覆盖显式设置的值
    pub async fn load(mut self) -> Result<Self> {
        if let Some(path) = self.properties_file.as_ref() {
            let from_file = Configuration::load_file(path).await?;
            self.properties.merge(&from_file);
        }
        Ok(self)
    }
}

/// Socialize SDK 选项构建器
pub struct SocializeOptionsBuilder {
    options: SocializeOptions,
}

impl SocializeOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: SocializeOptions::default(),
        }
    }

    /// 替换默认 bean 路径
    pub fn default_bean_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.default_bean_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn teardown_timeout(mut self, timeout: Duration) -> Self {
        self.options.teardown_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.options.debug_mode = enabled;
        self
    }

    pub fn property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.properties.set(key, value);
        self
    }

    pub fn consumer_key<S: Into<String>>(self, key: S) -> Self {
        self.property(CONSUMER_KEY, key)
    }

    pub fn consumer_secret<S: Into<String>>(self, secret: S) -> Self {
        self.property(CONSUMER_SECRET, secret)
    }

    pub fn properties(mut self, properties: Configuration) -> Self {
        self.options.properties.extend(&properties);
        self
    }

    pub fn properties_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.options.properties_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> SocializeOptions {
        self.options
    }
}

impl Default for SocializeOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
