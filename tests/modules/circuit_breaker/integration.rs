//! 熔断器模块集成测试
//!
//! 测试异步熔断器的状态转换、统计信息与并发探测

use crate::common::{init_tracing, DownstreamError, ScriptedService};
use breakeron::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState, CountingMode};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn call(
    breaker: &CircuitBreaker,
    service: &ScriptedService,
) -> Result<String, BreakerError<DownstreamError>> {
    breaker.execute(|| async { service.handle("svc") }).await
}

/// 测试熔断器的状态转换
#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_state_transitions() {
    init_tracing();

    let config = BreakerConfig::new(3).counting(CountingMode::Monotonic);
    let breaker = CircuitBreaker::new("test_service", config).unwrap();
    let service = ScriptedService::always_failing();

    // 初始状态应该是关闭的
    assert_eq!(breaker.state().await, CircuitState::Closed);

    // 触发失败
    for _ in 0..3 {
        let _ = call(&breaker, &service).await;
    }

    // 应该转为打开状态
    assert_eq!(breaker.state().await, CircuitState::Open);

    // 等待退避窗口结束，转为探测状态
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(breaker.state().await, CircuitState::Probing);
}

/// 测试熔断器的自动恢复
#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_auto_recovery() {
    let config = BreakerConfig::new(2)
        .base_backoff(Duration::from_millis(100))
        .counting(CountingMode::Monotonic);
    let breaker = CircuitBreaker::new("test_service", config).unwrap();
    let service = ScriptedService::new(vec![false, false], true);

    for _ in 0..2 {
        let _ = call(&breaker, &service).await;
    }
    assert!(breaker.is_open().await);
    assert!(call(&breaker, &service).await.unwrap_err().is_service_unavailable());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(call(&breaker, &service).await.unwrap(), "Hello svc");
    assert!(breaker.is_closed().await);
    assert_eq!(service.calls(), 3);
}

/// 测试统计信息
#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_stats() {
    let breaker = CircuitBreaker::new("stats_service", BreakerConfig::new(1)).unwrap();
    let service = ScriptedService::new(vec![true, false, false], false);

    call(&breaker, &service).await.unwrap();
    call(&breaker, &service).await.unwrap_err();
    call(&breaker, &service).await.unwrap_err();
    call(&breaker, &service).await.unwrap_err();

    let stats = breaker.stats().await;
    assert_eq!(stats.name, "stats_service");
    assert_eq!(stats.state, CircuitState::Open);
    assert_eq!(stats.total_calls, 4);
    assert_eq!(stats.rejected_calls, 1);
    assert_eq!(stats.counter.success_total, 1);
    assert_eq!(stats.counter.failure_total, 1);
    assert_eq!(stats.counter.consecutive_failures, 1);
    assert!(stats.last_activity.is_some());

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["state"], "Open");
}

/// 并发调用方只有一个探测调用到达被包装操作
#[tokio::test(start_paused = true)]
async fn test_concurrent_probe_is_serialized() {
    let config = BreakerConfig::new(1).counting(CountingMode::Monotonic);
    let breaker = Arc::new(CircuitBreaker::new("probe_service", config).unwrap());
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = breaker
        .execute(|| async { Err::<(), _>(DownstreamError("down".to_string())) })
        .await;
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(breaker.state().await, CircuitState::Probing);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let breaker = breaker.clone();
        let invocations = invocations.clone();
        handles.push(tokio::spawn(async move {
            breaker
                .execute(|| async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<(), _>(DownstreamError("still down".to_string()))
                })
                .await
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap_err().is_service_unavailable() {
            rejected += 1;
        }
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(rejected, 9);
    assert_eq!(breaker.consecutive_failures().await, 2);
}

/// 熔断器不对被包装操作施加超时
#[tokio::test(start_paused = true)]
async fn test_slow_operation_is_not_interrupted() {
    let breaker = CircuitBreaker::with_defaults("slow_service").unwrap();

    let result = breaker
        .execute(|| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, DownstreamError>("late")
        })
        .await;
    assert_eq!(result.unwrap(), "late");
}

/// 打开与恢复日志只在状态转换时输出
#[tokio::test(start_paused = true)]
async fn test_transition_logs_follow_state_changes() {
    let logs = crate::common::LogCapture::new();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let config = BreakerConfig::new(1).counting(CountingMode::Monotonic);
    let breaker = CircuitBreaker::new("logged", config).unwrap();
    let service = ScriptedService::new(vec![false, false, false], true);

    call(&breaker, &service).await.unwrap_err();
    for window in [2u64, 4] {
        tokio::time::sleep(Duration::from_secs(window) + Duration::from_millis(10)).await;
        call(&breaker, &service).await.unwrap_err();
    }
    tokio::time::sleep(Duration::from_secs(8) + Duration::from_millis(10)).await;
    call(&breaker, &service).await.unwrap();
    assert!(breaker.is_closed().await);

    assert_eq!(logs.lines_containing("进入打开状态"), 1);
    assert_eq!(logs.lines_containing("保持打开"), 2);
    assert_eq!(logs.lines_containing("恢复: Open -> Closed"), 1);
}

/// 调用进行中时状态与统计查询立即返回
#[tokio::test(start_paused = true)]
async fn test_stats_available_during_slow_call() {
    init_tracing();

    let registry = Arc::new(breakeron::BreakerRegistry::new());
    let slow = registry.get_or_insert("slow").unwrap();
    registry.get_or_insert("fast").unwrap();
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();

    let in_flight = tokio::spawn(async move {
        slow.execute(|| async move {
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err::<(), _>(DownstreamError("timeout".to_string()))
        })
        .await
    });
    started_rx.await.unwrap();

    let stats = tokio::time::timeout(Duration::from_millis(500), registry.stats())
        .await
        .expect("stats must not wait for the running call");
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[1].name, "slow");
    assert_eq!(stats[1].total_calls, 1);

    assert!(in_flight.await.unwrap().is_err());
}
