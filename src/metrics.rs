//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 监控指标模块
//!
//! 基于Prometheus记录熔断器的调用、失败、拒绝次数以及打开状态。
//!
//! # 示例
//!
//! ```rust
//! use breakeron::metrics::BreakerMetrics;
//!
//! let metrics = BreakerMetrics::new();
//! metrics.record_rejection("payments");
//! assert!(metrics.gather().contains("breakeron_rejections_total"));
//! ```

use crate::counter::Outcome;
use parking_lot::RwLock;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tracing::error;

// ============================================================================
// 辅助宏
// ============================================================================

/// 创建并注册 IntCounterVec 指标
macro_rules! register_counter_vec {
    ($name:expr, $help:expr, $registry:expr) => {{
        let counter = IntCounterVec::new(Opts::new($name, $help), &["breaker"])
            .expect("metric definition is static");
        $registry
            .register(Box::new(counter.clone()))
            .expect("metric names are unique within the registry");
        counter
    }};
}

/// 创建并注册 IntGaugeVec 指标
macro_rules! register_gauge_vec {
    ($name:expr, $help:expr, $registry:expr) => {{
        let gauge = IntGaugeVec::new(Opts::new($name, $help), &["breaker"])
            .expect("metric definition is static");
        $registry
            .register(Box::new(gauge.clone()))
            .expect("metric names are unique within the registry");
        gauge
    }};
}

/// 熔断器监控指标
///
/// 所有指标按熔断器名称（`breaker` 标签）区分。
#[derive(Clone)]
pub struct BreakerMetrics {
    /// 调用总数（含被拒绝的调用）
    pub calls_total: IntCounterVec,
    /// 成功次数
    pub successes_total: IntCounterVec,
    /// 失败次数
    pub failures_total: IntCounterVec,
    /// 拒绝次数
    pub rejections_total: IntCounterVec,
    /// 是否处于打开状态（1 为打开）
    pub open: IntGaugeVec,
    /// 指标注册表
    registry: Registry,
}

lazy_static::lazy_static! {
    /// 全局指标实例
    static ref GLOBAL_METRICS: RwLock<Option<Arc<BreakerMetrics>>> = RwLock::new(None);
}

/// 设置全局指标实例
///
/// 之后创建且未显式关联指标的熔断器都会记录到该实例。
pub fn set_global_metrics(metrics: Arc<BreakerMetrics>) {
    *GLOBAL_METRICS.write() = Some(metrics);
}

/// 获取全局指标实例
pub fn try_global() -> Option<Arc<BreakerMetrics>> {
    GLOBAL_METRICS.read().clone()
}

impl BreakerMetrics {
    /// 创建新的监控指标，并注册到内部注册表
    pub fn new() -> Self {
        let registry = Registry::new();

        let calls_total = register_counter_vec!(
            "breakeron_calls_total",
            "Total number of calls seen by the circuit breaker",
            &registry
        );
        let successes_total = register_counter_vec!(
            "breakeron_successes_total",
            "Total number of successful wrapped operations",
            &registry
        );
        let failures_total = register_counter_vec!(
            "breakeron_failures_total",
            "Total number of failed wrapped operations",
            &registry
        );
        let rejections_total = register_counter_vec!(
            "breakeron_rejections_total",
            "Total number of calls rejected while the breaker was open",
            &registry
        );
        let open = register_gauge_vec!(
            "breakeron_open",
            "Whether the circuit breaker is currently open (1) or not (0)",
            &registry
        );

        Self {
            calls_total,
            successes_total,
            failures_total,
            rejections_total,
            open,
            registry,
        }
    }

    /// 记录一次执行结果
    pub fn record_outcome(&self, breaker: &str, outcome: Outcome) {
        self.calls_total.with_label_values(&[breaker]).inc();
        match outcome {
            Outcome::Success => self.successes_total.with_label_values(&[breaker]).inc(),
            Outcome::Failure => self.failures_total.with_label_values(&[breaker]).inc(),
        }
    }

    /// 记录一次拒绝
    pub fn record_rejection(&self, breaker: &str) {
        self.calls_total.with_label_values(&[breaker]).inc();
        self.rejections_total.with_label_values(&[breaker]).inc();
    }

    /// 更新打开状态
    pub fn set_open(&self, breaker: &str, open: bool) {
        self.open
            .with_label_values(&[breaker])
            .set(if open { 1 } else { 0 });
    }

    /// 收集所有指标并返回Prometheus格式的文本
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// 内部注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for BreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
