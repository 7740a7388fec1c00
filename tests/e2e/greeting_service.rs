//! 问候服务场景
//!
//! 同一个名字连续请求六次，服务对 "Anton" 总是失败。

use crate::common::DownstreamError;
use breakeron::{Breaker, BreakerError};

fn greet(name: &str) -> Result<String, DownstreamError> {
    if name == "Anton" {
        return Err(DownstreamError("Error".to_string()));
    }
    Ok(format!("Hello {}", name))
}

#[test]
fn test_six_calls_against_failing_name() {
    let guarded = Breaker::new(greet, 2);

    let results: Vec<_> = (0..6).map(|_| guarded.call("Anton")).collect();

    // 前三次到达服务并失败，之后在 2s 窗口内全部被拒绝
    for result in &results[..3] {
        assert!(matches!(result, Err(BreakerError::Operation(e)) if e.0 == "Error"));
    }
    for result in &results[3..] {
        assert!(matches!(result, Err(BreakerError::ServiceUnavailable { .. })));
    }
}

#[test]
fn test_other_names_pass_until_open() {
    let guarded = Breaker::new(greet, 2);

    assert_eq!(guarded.call("Ada").unwrap(), "Hello Ada");
    for _ in 0..3 {
        guarded.call("Anton").unwrap_err();
    }
    // 熔断器不区分输入
    assert!(guarded.call("Ada").unwrap_err().is_service_unavailable());
}
