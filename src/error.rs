//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型定义
//!
//! 使用thiserror定义所有错误类型。

use crate::counter::CounterSnapshot;
use std::time::Duration;
use thiserror::Error;

/// 熔断器调用错误
///
/// 熔断器只引入一种自身的错误：`ServiceUnavailable`。
/// 被包装操作返回的错误原样放在 `Operation` 中。
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    /// 熔断器打开，退避窗口尚未结束，操作未被调用
    #[error("服务不可用: 熔断器打开，{retry_after:?} 后可重试")]
    ServiceUnavailable {
        /// 距离退避窗口结束的剩余时间
        retry_after: Duration,
    },

    /// 被包装操作自身返回的错误
    #[error("{0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// 是否为熔断拒绝
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, BreakerError::ServiceUnavailable { .. })
    }

    /// 取出被包装操作的原始错误
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            BreakerError::ServiceUnavailable { .. } => None,
        }
    }

    /// 熔断拒绝时返回剩余等待时间
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BreakerError::ServiceUnavailable { retry_after } => Some(*retry_after),
            BreakerError::Operation(_) => None,
        }
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置值无效
    #[error("配置错误: {0}")]
    Invalid(String),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// TOML解析错误
    #[error("TOML解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 熔断器状态
///
/// 由计数器和时钟推导，从不单独存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CircuitState {
    /// 关闭状态（正常）
    Closed,
    /// 打开状态（熔断）
    Open,
    /// 探测状态（退避窗口已过，下一次调用作为探测）
    Probing,
}

/// 熔断器统计信息
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CircuitBreakerStats {
    /// 熔断器名称
    pub name: String,
    /// 当前状态
    pub state: CircuitState,
    /// 计数器快照
    pub counter: CounterSnapshot,
    /// 总调用次数（含被拒绝的调用）
    pub total_calls: u64,
    /// 被拒绝的调用次数
    pub rejected_calls: u64,
    /// 最后活动时间
    pub last_activity: Option<chrono::DateTime<chrono::Utc>>,
}
