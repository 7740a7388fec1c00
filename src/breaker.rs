//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 函数包装熔断器
//!
//! 将一个 `Fn(I) -> Result<O, E>` 包装为输入输出形状相同的调用，
//! 在委托之前应用熔断策略。
//!
//! 检查、调用、记录三个步骤由调用闸门串行化，不会出现两个调用同时被当作
//! 唯一的探测调用。计数器使用单独的锁，状态查询不等待进行中的调用。

use crate::backoff::{Admission, BackoffPolicy};
use crate::config::BreakerConfig;
use crate::counter::{Counter, CounterSnapshot, Outcome};
use crate::error::{BreakerError, CircuitState, ConfigError};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 函数包装熔断器
///
/// # 示例
/// ```rust
/// use breakeron::Breaker;
///
/// let greet = Breaker::new(
///     |name: &str| -> Result<String, String> { Ok(format!("Hello {}", name)) },
///     2,
/// );
/// assert_eq!(greet.call("Ada").unwrap(), "Hello Ada");
/// ```
pub struct Breaker<F> {
    operation: F,
    policy: BackoffPolicy,
    gate: Mutex<()>,
    counter: Mutex<Box<dyn Counter>>,
}

impl<F> Breaker<F> {
    /// 使用指定失败阈值包装操作
    ///
    /// 失败阈值为 0 时按 1 处理。
    pub fn new(operation: F, failure_threshold: u32) -> Self {
        if failure_threshold == 0 {
            warn!("失败阈值为0，按1处理");
        }
        let config = BreakerConfig::new(failure_threshold.max(1));
        Self::build(operation, &config)
    }

    /// 使用完整配置包装操作
    pub fn with_config(operation: F, config: &BreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(operation, config))
    }

    fn build(operation: F, config: &BreakerConfig) -> Self {
        info!(
            "创建熔断器: failure_threshold={}, base_backoff={:?}, counting={:?}",
            config.failure_threshold,
            config.base_backoff_duration(),
            config.counting
        );

        Self {
            operation,
            policy: BackoffPolicy::from(config),
            gate: Mutex::new(()),
            counter: Mutex::new(config.counting.build()),
        }
    }

    /// 调用被包装的操作
    ///
    /// 熔断器打开且退避窗口未结束时直接返回 [`BreakerError::ServiceUnavailable`]，
    /// 不调用操作，也不修改计数器。
    ///
    /// 操作执行期间持有调用闸门，操作内部不能再次调用同一个熔断器。
    pub fn call<I, O, E>(&self, input: I) -> Result<O, BreakerError<E>>
    where
        F: Fn(I) -> Result<O, E>,
    {
        let _gate = self.gate.lock();

        let admission = {
            let counter = self.counter.lock();
            self.policy.admit(
                counter.consecutive_failures(),
                counter.last_activity(),
                Instant::now(),
            )
        };
        match admission {
            Admission::Rejected { retry_after } => {
                warn!("熔断器打开，拒绝请求 (retry_after={:?})", retry_after);
                return Err(BreakerError::ServiceUnavailable { retry_after });
            }
            Admission::Probe => {
                debug!(
                    "退避窗口已过，放行探测调用 (consecutive_failures={})",
                    self.counter.lock().consecutive_failures()
                );
            }
            Admission::Closed => {}
        }

        match (self.operation)(input) {
            Ok(value) => {
                self.record(Outcome::Success);
                Ok(value)
            }
            Err(e) => {
                self.record(Outcome::Failure);
                Err(BreakerError::Operation(e))
            }
        }
    }

    fn record(&self, outcome: Outcome) {
        let mut counter = self.counter.lock();
        let was_open = self.policy.backoff_level(counter.consecutive_failures()).is_some();
        counter.record(outcome);
        let window = self
            .policy
            .backoff_level(counter.consecutive_failures())
            .map(|level| self.policy.window(level));

        match window {
            Some(window) if !was_open => warn!(
                "熔断器进入打开状态: consecutive_failures={}, 窗口 {:?}",
                counter.consecutive_failures(),
                window
            ),
            Some(window) => debug!(
                "熔断器保持打开: consecutive_failures={}, 窗口 {:?}",
                counter.consecutive_failures(),
                window
            ),
            None if was_open => info!("熔断器恢复: Open -> Closed"),
            None => {}
        }
    }

    /// 当前状态
    pub fn state(&self) -> CircuitState {
        let counter = self.counter.lock();
        self.policy
            .admit(
                counter.consecutive_failures(),
                counter.last_activity(),
                Instant::now(),
            )
            .state()
    }

    /// 熔断器打开时返回剩余等待时间
    pub fn retry_after(&self) -> Option<Duration> {
        let counter = self.counter.lock();
        match self.policy.admit(
            counter.consecutive_failures(),
            counter.last_activity(),
            Instant::now(),
        ) {
            Admission::Rejected { retry_after } => Some(retry_after),
            _ => None,
        }
    }

    /// 当前连续失败次数
    pub fn consecutive_failures(&self) -> u64 {
        self.counter.lock().consecutive_failures()
    }

    /// 最后活动时间
    pub fn last_activity(&self) -> Instant {
        self.counter.lock().last_activity()
    }

    /// 计数器快照
    pub fn snapshot(&self) -> CounterSnapshot {
        self.counter.lock().snapshot()
    }

    /// 重置计数器，熔断器回到关闭状态
    pub fn reset(&self) {
        info!("重置熔断器");
        self.counter.lock().reset();
    }

    /// 退避策略
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl<F> fmt::Debug for Breaker<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breaker")
            .field("policy", &self.policy)
            .field("counter", &*self.counter.lock())
            .finish()
    }
}
