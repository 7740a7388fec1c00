//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Breakeron.
//!
//! All defaults used by [`BreakerConfig`](crate::config::BreakerConfig) and the
//! backoff policy are defined here with their purpose and usage context.

// ============================================================================
// Circuit Breaker Constants
// ============================================================================

/// Default failure threshold for circuit breaker.
///
/// The breaker opens once the consecutive-failure run reaches this value.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Minimum valid failure threshold.
///
/// A threshold of zero would open the breaker before any call was made.
pub const MIN_FAILURE_THRESHOLD: u32 = 1;

/// Base backoff window in milliseconds (2 seconds).
///
/// Backoff level 0 waits this long, every further consecutive failure doubles it.
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 2_000;

/// Default cap on the backoff exponent.
///
/// With the default base this caps the window at 2s * 2^16, roughly 36 hours.
pub const DEFAULT_MAX_BACKOFF_EXPONENT: u32 = 16;

/// Hard upper bound for the backoff exponent.
///
/// Keeps `1 << exponent` inside a `u64`.
pub const MAX_BACKOFF_EXPONENT_LIMIT: u32 = 63;

// ============================================================================
// Registry Constants
// ============================================================================

/// Maximum breaker name length (128 characters).
pub const MAX_BREAKER_NAME_LENGTH: usize = 128;
