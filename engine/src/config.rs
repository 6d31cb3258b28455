//! `EngineConfig` — every setting needed to stand up one [`crate::Engine`]
//! instance, following the teacher's `BridgeConfig` shape (plain data,
//! `Default` impl, loaded from a host's own `drift.toml`-style config
//! rather than owning its own file format here).

use std::path::PathBuf;
use std::time::Duration;

use engine_cache::CacheConfig;
use engine_core::config::SecurityOptions;
use engine_fs::FileServiceConfig;
use serde::{Deserialize, Serialize};

/// Toggles and tuning for the optional Predictive Pre-loader (spec
/// §4.G). Disabled by default: a host that never calls `execute` more
/// than once per process gains nothing from warming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictiveConfig {
    pub enabled: bool,
    pub access_window_max_age_secs: u64,
    pub access_window_max_len: usize,
    pub max_candidates: usize,
}

impl Default for PredictiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_window_max_age_secs: 3600,
            access_window_max_len: 5_000,
            max_candidates: 64,
        }
    }
}

impl PredictiveConfig {
    pub(crate) fn to_preloader_config(&self) -> engine_predict::PreloaderConfig {
        engine_predict::PreloaderConfig {
            access_window_max_age: Duration::from_secs(self.access_window_max_age_secs),
            access_window_max_len: self.access_window_max_len,
            dependency_graph_recency: Duration::from_secs(30),
            max_candidates: self.max_candidates,
            strategies: engine_predict::default_strategies(),
        }
    }
}

/// Top-level configuration for one embedded engine instance (spec §6,
/// §9 "Ownership of state": one workspace root per `Engine`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub workspace_root: PathBuf,
    pub fs: FileServiceConfig,
    pub security: SecurityOptions,
    #[serde(skip)]
    pub cache: CacheConfig,
    pub predictive: PredictiveConfig,
    /// Where to persist predictor snapshots, warming targets, and
    /// benchmark baselines (spec §6 "Persisted state"). `None` keeps
    /// the engine fully ephemeral.
    pub storage_path: Option<PathBuf>,
}
