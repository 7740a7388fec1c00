//! Prelude module - Commonly used types for quick imports
//!
//! This module re-exports the most commonly used types from Breakeron,
//! allowing users to import them with a single `use breakeron::prelude::*;`
//! statement instead of importing each type individually.

// Core types - always available
pub use crate::breaker::Breaker;
pub use crate::circuit_breaker::CircuitBreaker;
pub use crate::config::{BreakerConfig, CountingMode};
pub use crate::error::{BreakerError, CircuitState};

// Counters
pub use crate::counter::{Counter, Outcome};

// Registry
pub use crate::registry::BreakerRegistry;

// Feature-gated exports
#[cfg(feature = "monitoring")]
pub use crate::metrics::BreakerMetrics;
