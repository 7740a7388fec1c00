//! 下游故障与恢复全流程
//!
//! 关闭 -> 打开 -> 多次探测失败（窗口翻倍） -> 探测成功 -> 关闭 -> 重置

use crate::common::{init_tracing, ScriptedService};
use breakeron::{BreakerConfig, CircuitBreaker, CircuitState, CountingMode};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_full_outage_lifecycle() {
    init_tracing();

    // 3次成功，随后故障持续5次调用，然后恢复
    let service = ScriptedService::new(
        vec![true, true, true, false, false, false, false, false],
        true,
    );
    let config = BreakerConfig::new(2).counting(CountingMode::Monotonic);
    let breaker = CircuitBreaker::new("inventory", config).unwrap();

    for _ in 0..3 {
        breaker
            .execute(|| async { service.handle("item") })
            .await
            .unwrap();
    }
    assert!(breaker.is_closed().await);

    // 故障开始：两次失败后熔断
    for _ in 0..2 {
        breaker
            .execute(|| async { service.handle("item") })
            .await
            .unwrap_err();
    }
    assert!(breaker.is_open().await);

    // 每次探测失败，窗口翻倍
    let mut windows = Vec::new();
    for _ in 0..3 {
        let window = breaker.retry_after().await.unwrap();
        windows.push(window);

        // 窗口内的请求被拒绝
        let rejected = breaker
            .execute(|| async { service.handle("item") })
            .await
            .unwrap_err();
        assert!(rejected.is_service_unavailable());

        tokio::time::sleep(window + Duration::from_millis(10)).await;
        assert_eq!(breaker.state().await, CircuitState::Probing);
        let probe = breaker
            .execute(|| async { service.handle("item") })
            .await
            .unwrap_err();
        assert!(!probe.is_service_unavailable());
    }
    assert_eq!(
        windows,
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8)
        ]
    );

    // 恢复：探测成功后关闭
    let window = breaker.retry_after().await.unwrap();
    assert_eq!(window, Duration::from_secs(16));
    tokio::time::sleep(window + Duration::from_millis(10)).await;
    breaker
        .execute(|| async { service.handle("item") })
        .await
        .unwrap();
    assert!(breaker.is_closed().await);
    assert_eq!(breaker.consecutive_failures().await, 0);

    let stats = breaker.stats().await;
    assert_eq!(stats.rejected_calls, 3);
    assert_eq!(stats.counter.failure_total, 5);
    assert_eq!(stats.counter.success_total, 4);
    assert_eq!(service.calls(), 9);

    breaker.reset().await;
    assert!(breaker.snapshot().await.is_pristine());
}
