//! Core types for fetchmd

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default per-hop timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default response size ceiling (5 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of redirects followed
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Limits governing one fetch operation
///
/// The timeout applies to each hop separately, so a chain of `n` redirects
/// may take up to `n + 1` timeouts in total. Partial configuration objects
/// deserialize on top of the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchBudget {
    /// Wall-clock limit for one hop, headers and body included
    pub timeout_ms: u64,
    /// Maximum decoded body size in bytes
    pub max_bytes: u64,
    /// Maximum number of redirects followed
    pub max_redirects: u32,
}

impl Default for FetchBudget {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_bytes: DEFAULT_MAX_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl FetchBudget {
    /// Set the per-hop timeout in milliseconds
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the body size ceiling
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the redirect limit
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Per-hop timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Result of a single hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopOutcome {
    /// Redirect target, not yet validated
    Redirect(Url),
    /// Decoded HTML body
    Html(String),
}
