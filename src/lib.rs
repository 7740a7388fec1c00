//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Breakeron - Consecutive-Failure Circuit Breaker
//!
//! Wraps a fallible operation, counts its outcomes, and after a run of
//! consecutive failures rejects calls for an exponentially growing backoff
//! window before letting a single probe through.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use breakeron::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`Breaker`] - Synchronous wrapper around `Fn(I) -> Result<O, E>`
//! - [`CircuitBreaker`] - Async breaker executing ad hoc futures
//! - [`BreakerConfig`] - Threshold, backoff and counting configuration
//! - [`BreakerError`] - Either `ServiceUnavailable` or the operation's own error
//!
//! ## Building Blocks
//!
//! - [`counter`] - Outcome counters (`OutcomeCounter`, `MonotonicCounter`)
//! - [`backoff`] - Backoff window computation and admission decisions
//! - [`registry`] - Named, independent breakers per downstream dependency
//!
//! ## Extensions (feature-gated)
//!
//! - Prometheus metrics (requires `monitoring` feature)
//!
//! # Examples
//!
//! ```rust
//! use breakeron::prelude::*;
//!
//! fn lookup(user: &str) -> Result<String, String> {
//!     if user == "Anton" {
//!         return Err("Error".to_string());
//!     }
//!     Ok(format!("Hello {}", user))
//! }
//!
//! let guarded = Breaker::new(lookup, 2);
//! assert_eq!(guarded.call("Ada").unwrap(), "Hello Ada");
//!
//! for _ in 0..3 {
//!     assert!(matches!(guarded.call("Anton"), Err(BreakerError::Operation(_))));
//! }
//! assert!(guarded.call("Ada").unwrap_err().is_service_unavailable());
//! ```
//!
//! # Features
//!
//! - **Exponential backoff**: 2s, 4s, 8s, ... past the failure threshold, with a capped exponent
//! - **Single probe**: one call is let through once the window elapses
//! - **Serialized decisions**: the reject/probe decision and the outcome update are atomic per breaker
//! - **Two counting modes**: literal compatible counting or monotonic totals
//! - **Monitoring**: Prometheus metrics behind the `monitoring` feature

pub mod prelude;

pub mod backoff;
pub mod breaker;
pub mod circuit_breaker;
pub mod config;
pub mod constants;
pub mod counter;
pub mod error;
#[cfg(feature = "monitoring")]
pub mod metrics;
pub mod registry;

// 重新导出常用类型
pub use backoff::{Admission, BackoffPolicy};
pub use breaker::Breaker;
pub use circuit_breaker::CircuitBreaker;
pub use config::{BreakerConfig, CountingMode, RegistryConfig};
pub use counter::{Counter, CounterSnapshot, MonotonicCounter, Outcome, OutcomeCounter};
pub use error::{BreakerError, CircuitBreakerStats, CircuitState, ConfigError};
#[cfg(feature = "monitoring")]
pub use metrics::{set_global_metrics, try_global, BreakerMetrics};
pub use registry::{BreakerRegistry, GLOBAL_BREAKER_REGISTRY};
