//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 熔断器实现
//!
//! 提供异步熔断器，连续失败达到阈值后熔断，并以指数退避探测恢复。
//!
//! # 特性
//!
//! - **自动熔断**: 连续失败次数达到阈值后拒绝请求
//! - **指数退避**: 每多一次连续失败，退避窗口翻倍
//! - **单次探测**: 退避窗口结束后放行一次调用，其结果决定下一次状态
//! - **串行判定**: 判定、执行、记录由调用闸门串行化
//! - **非阻塞读取**: 状态与统计只短暂持有计数器锁，不等待进行中的调用
//! - **统计信息**: 提供详细的统计信息

use crate::backoff::{Admission, BackoffPolicy};
use crate::config::{validate_name, BreakerConfig};
use crate::counter::{Counter, CounterSnapshot, Outcome};
use crate::error::{BreakerError, CircuitBreakerStats, CircuitState, ConfigError};
#[cfg(feature = "monitoring")]
use crate::metrics::BreakerMetrics;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "monitoring")]
use std::sync::Arc;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// 熔断器
pub struct CircuitBreaker {
    /// 名称
    name: String,
    /// 调用闸门，判定、执行、记录期间持有
    gate: tokio::sync::Mutex<()>,
    /// 计数器，仅在判定和记录时短暂加锁
    counter: Mutex<Box<dyn Counter>>,
    /// 总调用次数
    total_calls: AtomicU64,
    /// 被拒绝的调用次数
    rejected_calls: AtomicU64,
    /// 退避策略
    policy: BackoffPolicy,
    /// 配置
    config: BreakerConfig,
    #[cfg(feature = "monitoring")]
    metrics: Option<Arc<BreakerMetrics>>,
}

impl CircuitBreaker {
    /// 创建新的熔断器
    ///
    /// # 参数
    /// - `name`: 熔断器名称，用于日志和统计
    /// - `config`: 熔断器配置
    ///
    /// # 示例
    /// ```rust
    /// use breakeron::{BreakerConfig, CircuitBreaker};
    ///
    /// let breaker = CircuitBreaker::new("payments", BreakerConfig::new(3)).unwrap();
    /// assert_eq!(breaker.name(), "payments");
    /// ```
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_name(&name)?;
        config.validate()?;
        Ok(Self::new_unchecked(name, config))
    }

    /// 使用默认配置创建熔断器
    pub fn with_defaults(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(name, BreakerConfig::default())
    }

    pub(crate) fn new_unchecked(name: String, config: BreakerConfig) -> Self {
        info!(
            "创建熔断器[{}]: failure_threshold={}, base_backoff={:?}, counting={:?}",
            name,
            config.failure_threshold,
            config.base_backoff_duration(),
            config.counting
        );

        Self {
            gate: tokio::sync::Mutex::new(()),
            counter: Mutex::new(config.counting.build()),
            total_calls: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
            policy: BackoffPolicy::from(&config),
            name,
            config,
            #[cfg(feature = "monitoring")]
            metrics: crate::metrics::try_global(),
        }
    }

    /// 关联监控指标
    ///
    /// 未显式关联时使用 [`crate::metrics::set_global_metrics`] 设置的全局指标。
    #[cfg(feature = "monitoring")]
    pub fn with_metrics(mut self, metrics: Arc<BreakerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 执行操作，自动处理熔断逻辑
    ///
    /// # 参数
    /// - `operation`: 要执行的操作
    ///
    /// # 返回
    /// - `Ok(T)`: 操作成功
    /// - `Err(BreakerError::Operation(e))`: 操作失败，`e` 为原始错误
    /// - `Err(BreakerError::ServiceUnavailable { .. })`: 熔断器打开，操作未执行
    ///
    /// 操作执行期间持有调用闸门，同一熔断器上的其他 `execute` 会等待；
    /// 状态与统计查询不受影响。
    ///
    /// # 示例
    /// ```rust
    /// use breakeron::{BreakerConfig, CircuitBreaker};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let breaker = CircuitBreaker::new("inventory", BreakerConfig::new(5)).unwrap();
    ///
    /// let result = breaker
    ///     .execute(|| async { Ok::<u32, std::io::Error>(7) })
    ///     .await;
    /// assert_eq!(result.unwrap(), 7);
    /// # }
    /// ```
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // 增加总调用次数
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let _gate = self.gate.lock().await;

        let admission = self.admit(&**self.counter.lock());
        match admission {
            Admission::Rejected { retry_after } => {
                self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "monitoring")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection(&self.name);
                }
                warn!(
                    "熔断器[{}]打开，拒绝请求 (retry_after={:?})",
                    self.name, retry_after
                );
                return Err(BreakerError::ServiceUnavailable { retry_after });
            }
            Admission::Probe => {
                debug!(
                    "熔断器[{}]退避窗口已过，放行探测调用 (consecutive_failures={})",
                    self.name,
                    self.counter.lock().consecutive_failures()
                );
            }
            Admission::Closed => {}
        }

        let result = operation().await;

        // 根据操作结果更新计数
        match result {
            Ok(value) => {
                self.on_outcome(&mut **self.counter.lock(), Outcome::Success);
                Ok(value)
            }
            Err(e) => {
                self.on_outcome(&mut **self.counter.lock(), Outcome::Failure);
                Err(BreakerError::Operation(e))
            }
        }
    }

    fn admit(&self, counter: &dyn Counter) -> Admission {
        self.policy.admit(
            counter.consecutive_failures(),
            counter.last_activity(),
            Instant::now(),
        )
    }

    /// 记录结果
    fn on_outcome(&self, counter: &mut dyn Counter, outcome: Outcome) {
        let was_open = self.is_tripped(counter);
        counter.record(outcome);
        let now_open = self.is_tripped(counter);

        trace!(
            "熔断器[{}]记录结果: {} (consecutive_failures={})",
            self.name,
            outcome,
            counter.consecutive_failures()
        );

        if now_open && !was_open {
            warn!(
                "熔断器[{}]进入打开状态: consecutive_failures={}, 退避窗口 {:?}",
                self.name,
                counter.consecutive_failures(),
                self.current_window(counter).unwrap_or_default()
            );
        } else if now_open {
            debug!(
                "熔断器[{}]保持打开: consecutive_failures={}, 退避窗口 {:?}",
                self.name,
                counter.consecutive_failures(),
                self.current_window(counter).unwrap_or_default()
            );
        } else if was_open {
            info!("熔断器[{}]恢复: Open -> Closed", self.name);
        }

        #[cfg(feature = "monitoring")]
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(&self.name, outcome);
            metrics.set_open(&self.name, now_open);
        }
    }

    /// 连续失败次数是否达到阈值
    fn is_tripped(&self, counter: &dyn Counter) -> bool {
        self.policy
            .backoff_level(counter.consecutive_failures())
            .is_some()
    }

    fn current_window(&self, counter: &dyn Counter) -> Option<Duration> {
        self.policy
            .backoff_level(counter.consecutive_failures())
            .map(|level| self.policy.window(level))
    }

    /// 检查熔断器是否打开
    pub async fn is_open(&self) -> bool {
        self.state().await == CircuitState::Open
    }

    /// 检查熔断器是否关闭
    pub async fn is_closed(&self) -> bool {
        self.state().await == CircuitState::Closed
    }

    /// 获取当前状态
    pub async fn state(&self) -> CircuitState {
        self.admit(&**self.counter.lock()).state()
    }

    /// 熔断器打开时返回剩余等待时间
    pub async fn retry_after(&self) -> Option<Duration> {
        let admission = self.admit(&**self.counter.lock());
        match admission {
            Admission::Rejected { retry_after } => Some(retry_after),
            _ => None,
        }
    }

    /// 当前连续失败次数
    pub async fn consecutive_failures(&self) -> u64 {
        self.counter.lock().consecutive_failures()
    }

    /// 计数器快照
    pub async fn snapshot(&self) -> CounterSnapshot {
        self.counter.lock().snapshot()
    }

    /// 重置熔断器到关闭状态
    pub async fn reset(&self) {
        info!("重置熔断器[{}]", self.name);
        self.counter.lock().reset();
        self.total_calls.store(0, Ordering::Relaxed);
        self.rejected_calls.store(0, Ordering::Relaxed);

        #[cfg(feature = "monitoring")]
        if let Some(metrics) = &self.metrics {
            metrics.set_open(&self.name, false);
        }
    }

    /// 获取统计信息
    pub async fn stats(&self) -> CircuitBreakerStats {
        let counter = self.counter.lock();
        let state = self.admit(&**counter).state();

        let elapsed = Instant::now().saturating_duration_since(counter.last_activity());
        let last_activity = chrono::Duration::from_std(elapsed)
            .ok()
            .map(|d| chrono::Utc::now() - d);

        CircuitBreakerStats {
            name: self.name.clone(),
            state,
            counter: counter.snapshot(),
            total_calls: self.total_calls.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            last_activity,
        }
    }

    /// 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取配置
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("total_calls", &self.total_calls.load(Ordering::Relaxed))
            .field("rejected_calls", &self.rejected_calls.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
