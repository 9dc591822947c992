//! Reconnect policy.
//!
//! Decides whether another attempt is made after an unexpected close, and
//! how long to wait before it. The attempt counter itself lives in the
//! client; the policy is a pure function of it.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::options::ClientConfig;

// ============================================================================
// Constants
// ============================================================================

/// Cap applied when an exponential config omits `maxIntervalMs`.
const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;

/// Doubling stops growing past this exponent.
const MAX_EXPONENT: u32 = 30;

fn default_max_interval_ms() -> u64 {
    DEFAULT_MAX_INTERVAL_MS
}

// ============================================================================
// Backoff
// ============================================================================

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum Backoff {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// Delay doubles per attempt up to `max_interval_ms`.
    #[serde(rename_all = "camelCase")]
    Exponential {
        /// Upper bound of the delay, in milliseconds.
        #[serde(default = "default_max_interval_ms")]
        max_interval_ms: u64,
        /// Add up to a quarter of the delay as random jitter.
        #[serde(default)]
        jitter: bool,
    },
}

impl Backoff {
    /// Delay before the retry that follows `attempts` earlier retries.
    #[must_use]
    pub fn delay(&self, base: Duration, attempts: u32) -> Duration {
        match *self {
            Self::Fixed => base,
            Self::Exponential {
                max_interval_ms,
                jitter,
            } => {
                let exp = attempts.min(MAX_EXPONENT);
                let delay = base
                    .saturating_mul(1u32 << exp)
                    .min(Duration::from_millis(max_interval_ms));
                if jitter {
                    delay + jitter_for(delay)
                } else {
                    delay
                }
            }
        }
    }
}

/// Up to a quarter of `delay`, seeded from the wall clock.
fn jitter_for(delay: Duration) -> Duration {
    let span = (delay.as_millis() as u64 / 4).max(1);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    Duration::from_millis(nanos % span)
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Retry decision for unexpected closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retry at all.
    pub enabled: bool,
    /// Base delay.
    pub interval: Duration,
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Delay growth.
    pub backoff: Backoff,
}

impl ReconnectPolicy {
    /// Builds the policy from a client config.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            enabled: config.auto_reconnect,
            interval: config.reconnect_interval(),
            max_attempts: config.max_reconnect_attempts,
            backoff: config.backoff,
        }
    }

    /// Returns the delay before the next attempt, or `None` to stop.
    ///
    /// `attempts` is the number of retries already made since the last
    /// successful open.
    #[must_use]
    pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
        if !self.enabled || attempts >= self.max_attempts {
            return None;
        }
        Some(self.backoff.delay(self.interval, attempts))
    }
}

// ============================================================================
// Tests
// ============================================================================
