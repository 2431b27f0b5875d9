//! Sharing and persistence settings.

use flow_core::FlowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for retryable failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            multiplier: 2.0,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately; for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            multiplier: 1.0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// How many fresh codes to try before giving up on a collision streak.
    pub max_code_attempts: u32,
    /// Upper bound on `list_public_flows` regardless of the caller's limit.
    pub max_public_listing: usize,
    pub save_retry: RetryPolicy,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: 8,
            max_public_listing: 100,
            save_retry: RetryPolicy::default(),
        }
    }
}

impl ShareConfig {
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }
}
