//! Request-scoped options, matching spec §6's `options` object.

use serde::{Deserialize, Serialize};

/// Global options accompanying a [`crate::model::Request`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RequestOptions {
    /// Maximum operations dispatched concurrently within one stage.
    pub concurrency: Option<usize>,
    /// Whole-request deadline.
    pub timeout_ms: Option<u64>,
    pub cache: CacheOptions,
    pub security: SecurityOptions,
    pub monitoring: MonitoringOptions,
    /// Emit verbose tracing spans for this request.
    pub debug: Option<bool>,
}

impl RequestOptions {
    /// Effective concurrency, defaulting to the number of logical CPUs.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }

    pub fn effective_timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheOptions {
    pub max_bytes: Option<u64>,
    pub max_entries: Option<u64>,
    pub ttl_secs: Option<u64>,
}

impl CacheOptions {
    pub fn effective_max_bytes(&self) -> u64 {
        self.max_bytes.unwrap_or(256 * 1024 * 1024)
    }

    pub fn effective_max_entries(&self) -> u64 {
        self.max_entries.unwrap_or(10_000)
    }

    pub fn effective_ttl_secs(&self) -> u64 {
        self.ttl_secs.unwrap_or(15 * 60)
    }
}

/// Path allow/deny policy, spec §6 "Security surface".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecurityOptions {
    pub allowed_paths: Vec<String>,
    pub blocked_paths: Vec<String>,
    pub sandbox: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitoringOptions {
    pub enabled: Option<bool>,
}

impl MonitoringOptions {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}
