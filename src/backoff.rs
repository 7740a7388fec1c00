//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 指数退避策略
//!
//! 连续失败次数达到阈值后，熔断器在 `last_activity + base * 2^level` 之前拒绝调用，
//! 其中 `level = consecutive_failures - failure_threshold`。

use crate::config::BreakerConfig;
use crate::error::CircuitState;
use std::time::Duration;
use tokio::time::Instant;

/// 准入判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 熔断器关闭，正常放行
    Closed,
    /// 退避窗口已过，放行一次探测调用
    Probe,
    /// 熔断器打开，拒绝调用
    Rejected {
        /// 距离窗口结束的剩余时间
        retry_after: Duration,
    },
}

impl Admission {
    /// 对应的熔断器状态
    pub fn state(&self) -> CircuitState {
        match self {
            Admission::Closed => CircuitState::Closed,
            Admission::Probe => CircuitState::Probing,
            Admission::Rejected { .. } => CircuitState::Open,
        }
    }

    /// 是否放行
    pub fn is_permitted(&self) -> bool {
        !matches!(self, Admission::Rejected { .. })
    }
}

/// 退避策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    failure_threshold: u64,
    base: Duration,
    max_exponent: u32,
}

impl BackoffPolicy {
    /// 创建退避策略
    ///
    /// `max_exponent` 超过 63 时按 63 处理。
    pub fn new(failure_threshold: u32, base: Duration, max_exponent: u32) -> Self {
        Self {
            failure_threshold: u64::from(failure_threshold),
            base,
            max_exponent: max_exponent.min(crate::constants::MAX_BACKOFF_EXPONENT_LIMIT),
        }
    }

    /// 失败阈值
    pub fn failure_threshold(&self) -> u64 {
        self.failure_threshold
    }

    /// 连续失败次数对应的退避等级，熔断器关闭时返回 `None`
    pub fn backoff_level(&self, consecutive_failures: u64) -> Option<u64> {
        consecutive_failures.checked_sub(self.failure_threshold)
    }

    /// 指定退避等级的窗口长度
    ///
    /// 等级超过 `max_exponent` 时按上限计算，结果饱和到 `u64::MAX` 纳秒。
    pub fn window(&self, level: u64) -> Duration {
        let exponent = level.min(u64::from(self.max_exponent)) as u32;
        let nanos = self.base.as_nanos().saturating_mul(1u128 << exponent);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// 最早可重试时间，熔断器关闭时返回 `None`
    pub fn retry_at(&self, consecutive_failures: u64, last_activity: Instant) -> Option<Instant> {
        let level = self.backoff_level(consecutive_failures)?;
        last_activity.checked_add(self.window(level))
    }

    /// 判定当前调用是否放行
    ///
    /// 只有当 `now` 严格晚于最早可重试时间时才放行探测调用。
    pub fn admit(&self, consecutive_failures: u64, last_activity: Instant, now: Instant) -> Admission {
        let Some(level) = self.backoff_level(consecutive_failures) else {
            return Admission::Closed;
        };

        let window = self.window(level);
        match last_activity.checked_add(window) {
            Some(retry_at) if now > retry_at => Admission::Probe,
            Some(retry_at) => Admission::Rejected {
                retry_after: retry_at.saturating_duration_since(now),
            },
            // 时间溢出，视为窗口永不结束
            None => Admission::Rejected { retry_after: window },
        }
    }
}

impl From<&BreakerConfig> for BackoffPolicy {
    fn from(config: &BreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_millis(config.base_backoff_ms),
            config.max_backoff_exponent,
        )
    }
}
