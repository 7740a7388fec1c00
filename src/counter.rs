//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 调用结果计数器
//!
//! 记录被包装操作的调用结果，维护累计计数、连续计数和最后活动时间。
//!
//! # 计数策略
//!
//! - [`OutcomeCounter`]: 兼容策略，逐字保留历史计数规则
//!   （重复结果才延长连续计数，重复成功/失败都会减少失败累计）
//! - [`MonotonicCounter`]: 单调策略，累计计数只增不减，连续计数为真实的连续长度

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tracing::trace;

/// 单次调用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// 成功
    Success,
    /// 失败
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// 最近一次记录的结果，尚未记录时为 `None`
    pub current_state: Option<Outcome>,
    /// 失败累计
    pub failure_total: i64,
    /// 成功累计
    pub success_total: i64,
    /// 连续失败次数
    pub consecutive_failures: u64,
    /// 连续成功次数
    pub consecutive_successes: u64,
}

impl CounterSnapshot {
    /// 是否与新建计数器一致（不比较时间戳）
    pub fn is_pristine(&self) -> bool {
        *self == CounterSnapshot::default()
    }
}

/// 计数器接口
///
/// 每个熔断器持有一个独立的计数器，计数器从不在熔断器之间共享。
pub trait Counter: Send + Sync + fmt::Debug {
    /// 记录一次调用结果
    fn record(&mut self, outcome: Outcome);

    /// 当前连续失败次数
    fn consecutive_failures(&self) -> u64;

    /// 最后一次记录结果的时间（尚未记录时为创建或重置时间）
    fn last_activity(&self) -> Instant;

    /// 清空所有计数，并刷新最后活动时间
    fn reset(&mut self);

    /// 获取当前计数快照
    fn snapshot(&self) -> CounterSnapshot;
}

/// 兼容计数器
///
/// 规则：
/// - 成功：成功累计 +1；若上一次也是成功，则连续失败清零、失败累计 -1、连续成功 +1
/// - 失败：失败累计 +1；若上一次也是失败，则连续成功清零、失败累计 -1、连续失败 +1
///
/// 因此首次失败不会延长连续失败计数，重复失败时失败累计净变化为零。
#[derive(Debug, Clone)]
pub struct OutcomeCounter {
    state: CounterSnapshot,
    last_activity: Instant,
}

impl OutcomeCounter {
    /// 创建新的计数器
    pub fn new() -> Self {
        Self {
            state: CounterSnapshot::default(),
            last_activity: Instant::now(),
        }
    }

    /// 失败累计
    pub fn failure_total(&self) -> i64 {
        self.state.failure_total
    }

    /// 成功累计
    pub fn success_total(&self) -> i64 {
        self.state.success_total
    }

    /// 连续成功次数
    pub fn consecutive_successes(&self) -> u64 {
        self.state.consecutive_successes
    }

    /// 最近一次记录的结果
    pub fn current_state(&self) -> Option<Outcome> {
        self.state.current_state
    }
}

impl Default for OutcomeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter for OutcomeCounter {
    fn record(&mut self, outcome: Outcome) {
        let repeated = self.state.current_state == Some(outcome);
        let s = &mut self.state;

        match outcome {
            Outcome::Success => {
                s.success_total += 1;
                if repeated {
                    s.consecutive_failures = 0;
                    s.failure_total -= 1;
                    s.consecutive_successes += 1;
                }
            }
            Outcome::Failure => {
                s.failure_total += 1;
                if repeated {
                    s.consecutive_successes = 0;
                    s.failure_total -= 1;
                    s.consecutive_failures += 1;
                }
            }
        }
        s.current_state = Some(outcome);
        self.last_activity = touch(self.last_activity);

        trace!(
            "记录结果: {} (consecutive_failures={}, consecutive_successes={})",
            outcome,
            s.consecutive_failures,
            s.consecutive_successes
        );
    }

    fn consecutive_failures(&self) -> u64 {
        self.state.consecutive_failures
    }

    fn last_activity(&self) -> Instant {
        self.last_activity
    }

    fn reset(&mut self) {
        self.state = CounterSnapshot::default();
        self.last_activity = touch(self.last_activity);
    }

    fn snapshot(&self) -> CounterSnapshot {
        self.state
    }
}

/// 单调计数器
///
/// 累计计数只增不减；每个结果都会清零相反方向的连续计数并延长自身的连续计数。
#[derive(Debug, Clone)]
pub struct MonotonicCounter {
    state: CounterSnapshot,
    last_activity: Instant,
}

impl MonotonicCounter {
    /// 创建新的计数器
    pub fn new() -> Self {
        Self {
            state: CounterSnapshot::default(),
            last_activity: Instant::now(),
        }
    }
}

impl Default for MonotonicCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter for MonotonicCounter {
    fn record(&mut self, outcome: Outcome) {
        let s = &mut self.state;
        match outcome {
            Outcome::Success => {
                s.success_total += 1;
                s.consecutive_failures = 0;
                s.consecutive_successes += 1;
            }
            Outcome::Failure => {
                s.failure_total += 1;
                s.consecutive_successes = 0;
                s.consecutive_failures += 1;
            }
        }
        s.current_state = Some(outcome);
        self.last_activity = touch(self.last_activity);

        trace!(
            "记录结果: {} (consecutive_failures={}, consecutive_successes={})",
            outcome,
            s.consecutive_failures,
            s.consecutive_successes
        );
    }

    fn consecutive_failures(&self) -> u64 {
        self.state.consecutive_failures
    }

    fn last_activity(&self) -> Instant {
        self.last_activity
    }

    fn reset(&mut self) {
        self.state = CounterSnapshot::default();
        self.last_activity = touch(self.last_activity);
    }

    fn snapshot(&self) -> CounterSnapshot {
        self.state
    }
}

/// 最后活动时间只前进不后退
fn touch(previous: Instant) -> Instant {
    previous.max(Instant::now())
}
