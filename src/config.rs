//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 配置模块
//!
//! 定义熔断器配置，支持从 TOML、YAML、JSON 字符串或文件加载。

use crate::constants::{
    DEFAULT_BASE_BACKOFF_MS, DEFAULT_FAILURE_THRESHOLD, DEFAULT_MAX_BACKOFF_EXPONENT,
    MAX_BACKOFF_EXPONENT_LIMIT, MAX_BREAKER_NAME_LENGTH, MIN_FAILURE_THRESHOLD,
};
use crate::counter::{Counter, MonotonicCounter, OutcomeCounter};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// 计数策略
///
/// 默认的兼容策略中首次失败不计入连续失败，单次成功也不会清零连续失败计数，
/// 因此阈值为 `t` 时第 `t + 1` 次连续失败后才打开。需要“连续 `t` 次失败即打开、
/// 一次成功即恢复”的常见行为时使用 [`CountingMode::Monotonic`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    /// 兼容策略，见 [`OutcomeCounter`]
    #[default]
    Compatible,
    /// 单调策略，见 [`MonotonicCounter`]
    Monotonic,
}

impl CountingMode {
    /// 创建对应的计数器
    pub fn build(self) -> Box<dyn Counter> {
        match self {
            CountingMode::Compatible => Box::new(OutcomeCounter::new()),
            CountingMode::Monotonic => Box::new(MonotonicCounter::new()),
        }
    }
}

/// 熔断器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// 失败阈值（连续失败达到此值时熔断）
    pub failure_threshold: u32,
    /// 退避基准时长（毫秒），等级 0 的窗口长度
    pub base_backoff_ms: u64,
    /// 退避指数上限
    pub max_backoff_exponent: u32,
    /// 计数策略
    pub counting: CountingMode,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_backoff_exponent: DEFAULT_MAX_BACKOFF_EXPONENT,
            counting: CountingMode::default(),
        }
    }
}

impl BreakerConfig {
    /// 创建指定失败阈值的配置，其余取默认值
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            ..Default::default()
        }
    }

    /// 设置失败阈值
    pub fn failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// 设置退避基准时长
    pub fn base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 设置退避指数上限
    pub fn max_backoff_exponent(mut self, exponent: u32) -> Self {
        self.max_backoff_exponent = exponent;
        self
    }

    /// 设置计数策略
    pub fn counting(mut self, counting: CountingMode) -> Self {
        self.counting = counting;
        self
    }

    /// 退避基准时长
    pub fn base_backoff_duration(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold < MIN_FAILURE_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "failure_threshold 必须大于等于 {}",
                MIN_FAILURE_THRESHOLD
            )));
        }

        if self.base_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "base_backoff_ms 必须大于0".to_string(),
            ));
        }

        if self.max_backoff_exponent > MAX_BACKOFF_EXPONENT_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_backoff_exponent 不能超过 {}",
                MAX_BACKOFF_EXPONENT_LIMIT
            )));
        }

        Ok(())
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 YAML 字符串解析
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 字符串解析
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载，按扩展名选择格式
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => Self::from_toml_str(&content),
            ConfigFormat::Yaml => Self::from_yaml_str(&content),
            ConfigFormat::Json => Self::from_json_str(&content),
        }
    }
}

/// 熔断器注册表配置
///
/// ```toml
/// [default]
/// failure_threshold = 5
///
/// [breakers.payments]
/// failure_threshold = 2
/// base_backoff_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 未单独配置的熔断器使用的默认配置
    pub default: BreakerConfig,
    /// 按名称配置的熔断器
    pub breakers: BTreeMap<String, BreakerConfig>,
}

impl RegistryConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("默认配置校验失败: {}", e)))?;

        for (name, config) in &self.breakers {
            validate_name(name)?;
            config
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("熔断器[{}]校验失败: {}", name, e)))?;
        }

        Ok(())
    }

    /// 从文件加载，按扩展名选择格式
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
            ConfigFormat::Json => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// 校验熔断器名称
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid("熔断器名称不能为空".to_string()));
    }
    if name.len() > MAX_BREAKER_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "熔断器名称长度不能超过 {}",
            MAX_BREAKER_NAME_LENGTH
        )));
    }
    Ok(())
}

enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::Invalid(format!(
                "不支持的配置文件格式: {}",
                path.display()
            ))),
        }
    }
}
