//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 熔断器注册表
//!
//! 按名称管理相互独立的熔断器，每个下游依赖一个熔断器，熔断器之间不共享计数。

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{validate_name, BreakerConfig, RegistryConfig};
use crate::error::{CircuitBreakerStats, ConfigError};
#[cfg(feature = "monitoring")]
use crate::metrics::BreakerMetrics;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 熔断器注册表
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: BreakerConfig,
    overrides: BTreeMap<String, BreakerConfig>,
    #[cfg(feature = "monitoring")]
    metrics: Option<Arc<BreakerMetrics>>,
}

impl BreakerRegistry {
    /// 创建使用默认配置的注册表
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
            default_config: BreakerConfig::default(),
            overrides: BTreeMap::new(),
            #[cfg(feature = "monitoring")]
            metrics: None,
        }
    }

    /// 从注册表配置创建
    pub fn from_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "创建熔断器注册表: {} 个独立配置",
            config.breakers.len()
        );

        Ok(Self {
            breakers: DashMap::new(),
            default_config: config.default,
            overrides: config.breakers,
            #[cfg(feature = "monitoring")]
            metrics: None,
        })
    }

    /// 关联监控指标，之后创建的熔断器都会上报
    #[cfg(feature = "monitoring")]
    pub fn with_metrics(mut self, metrics: Arc<BreakerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 获取或创建熔断器
    ///
    /// 名称有独立配置时使用独立配置，否则使用默认配置。
    pub fn get_or_insert(&self, name: &str) -> Result<Arc<CircuitBreaker>, ConfigError> {
        let config = self
            .overrides
            .get(name)
            .unwrap_or(&self.default_config)
            .clone();
        self.get_or_insert_with(name, config)
    }

    /// 获取或使用指定配置创建熔断器
    ///
    /// 熔断器已存在时返回已有实例，`config` 被忽略。
    pub fn get_or_insert_with(
        &self,
        name: &str,
        config: BreakerConfig,
    ) -> Result<Arc<CircuitBreaker>, ConfigError> {
        if let Some(breaker) = self.breakers.get(name) {
            return Ok(breaker.clone());
        }

        validate_name(name)?;
        config.validate()?;

        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("注册熔断器: {}", name);
                Arc::new(self.build(name, config))
            })
            .clone();
        Ok(breaker)
    }

    #[cfg(feature = "monitoring")]
    fn build(&self, name: &str, config: BreakerConfig) -> CircuitBreaker {
        let breaker = CircuitBreaker::new_unchecked(name.to_string(), config);
        match &self.metrics {
            Some(metrics) => breaker.with_metrics(metrics.clone()),
            None => breaker,
        }
    }

    #[cfg(not(feature = "monitoring"))]
    fn build(&self, name: &str, config: BreakerConfig) -> CircuitBreaker {
        CircuitBreaker::new_unchecked(name.to_string(), config)
    }

    /// 获取已注册的熔断器
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| b.clone())
    }

    /// 移除熔断器
    pub fn remove(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.remove(name).map(|(_, b)| b)
    }

    /// 已注册的熔断器名称（按字典序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 已注册的熔断器数量
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// 重置所有熔断器
    pub async fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        info!("重置全部熔断器: {} 个", breakers.len());
        for breaker in breakers {
            breaker.reset().await;
        }
    }

    /// 所有熔断器的统计信息（按名称排序）
    pub async fn stats(&self) -> Vec<CircuitBreakerStats> {
        let mut breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        breakers.sort_by(|a, b| a.name().cmp(b.name()));

        let mut stats = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            stats.push(breaker.stats().await);
        }
        stats
    }

    /// 清除所有熔断器
    pub fn clear(&self) {
        self.breakers.clear();
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    /// 全局熔断器注册表实例
    pub static ref GLOBAL_BREAKER_REGISTRY: BreakerRegistry = BreakerRegistry::new();
}
