//! 注册表模块集成测试
//!
//! 测试多个下游依赖各自独立熔断

use crate::common::ScriptedService;
use breakeron::{BreakerConfig, BreakerRegistry, CircuitState, CountingMode};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_outage_isolated_to_one_dependency() {
    let registry = Arc::new(BreakerRegistry::new());
    let config = BreakerConfig::new(2).counting(CountingMode::Monotonic);

    let payments = ScriptedService::always_failing();
    let search = ScriptedService::always_succeeding();

    for _ in 0..5 {
        let breaker = registry
            .get_or_insert_with("payments", config.clone())
            .unwrap();
        let _ = breaker.execute(|| async { payments.handle("pay") }).await;

        let breaker = registry.get_or_insert_with("search", config.clone()).unwrap();
        breaker
            .execute(|| async { search.handle("find") })
            .await
            .unwrap();
    }

    assert_eq!(payments.calls(), 2);
    assert_eq!(search.calls(), 5);

    let stats = registry.stats().await;
    assert_eq!(stats[0].name, "payments");
    assert_eq!(stats[0].state, CircuitState::Open);
    assert_eq!(stats[0].rejected_calls, 3);
    assert_eq!(stats[1].name, "search");
    assert_eq!(stats[1].state, CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_registry_shared_across_tasks() {
    let registry = Arc::new(BreakerRegistry::new());

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("svc-{}", i % 2);
            let breaker = registry.get_or_insert(&name).unwrap();
            breaker
                .execute(|| async {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    Ok::<_, std::io::Error>(())
                })
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.names(), vec!["svc-0".to_string(), "svc-1".to_string()]);
    let stats = registry.stats().await;
    assert_eq!(stats[0].total_calls + stats[1].total_calls, 8);
}

#[tokio::test(start_paused = true)]
async fn test_removed_breaker_starts_fresh() {
    let registry = BreakerRegistry::new();
    let service = ScriptedService::always_failing();
    let config = BreakerConfig::new(1).counting(CountingMode::Monotonic);

    let breaker = registry.get_or_insert_with("db", config.clone()).unwrap();
    let _ = breaker.execute(|| async { service.handle("q") }).await;
    assert!(breaker.is_open().await);

    registry.remove("db");
    let fresh = registry.get_or_insert_with("db", config).unwrap();
    assert!(fresh.is_closed().await);
    assert!(!Arc::ptr_eq(&breaker, &fresh));
}
