//! # engine
//!
//! The facade crate (spec §2, §6): wires File Service, Cache, AST
//! Facade, Operation Planner, Transaction Manager, Execution Engine,
//! and the optional Predictive Pre-loader into the single embeddable
//! entry point a host (the out-of-scope CLI/RPC layer) calls —
//! `Engine::execute`. Modeled on the teacher's `BridgeRuntime`: a
//! config-constructed runtime struct owning every long-lived
//! collaborator, built once per workspace and reused across requests.

pub mod config;
pub mod errors;

pub use config::{EngineConfig, PredictiveConfig};
pub use errors::{EngineError, EngineResult};

use std::sync::Arc;

use engine_ast::facade::PluginRegistry;
use engine_ast::{AstFacade, LanguageParserPlugin};
use engine_cache::ArtifactCache;
use engine_core::events::{AccessEventSink, NullEventSink};
use engine_core::model::{CacheStatsSummary, Request, Response};
use engine_core::{CancellationToken, ProgressEvent};
use engine_exec::{Engine as ExecEngine, ExecContext};
use engine_fs::{FileService, SecurityPolicy};
use engine_predict::Preloader;
use engine_storage::{DocumentStore, Namespace, StorageResult};
use engine_tx::TransactionManager;
use tracing::instrument;

/// A fully wired engine instance, scoped to one workspace root (spec
/// §9 "Ownership of state": Cache and AST Facade are shared singletons
/// for the engine's lifetime; the Planner output and Transaction
/// Manager state are per-request collaborators created fresh inside
/// `execute`).
pub struct Engine {
    fs: Arc<FileService>,
    cache: Arc<ArtifactCache>,
    ast: Arc<AstFacade>,
    tx: Arc<TransactionManager>,
    preloader: Option<Arc<Preloader>>,
    storage: Option<Arc<DocumentStore>>,
}

impl Engine {
    /// Build an engine with the two reference AST plugins (tree-sitter
    /// Rust plus the plain-text fallback) and nothing else registered.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_ast_plugins(config, Vec::new())
    }

    /// Build an engine, additionally registering `extra_plugins` ahead
    /// of the two reference plugins (most-specific-extension-match
    /// selection means an extra plugin only wins when it claims a more
    /// specific extension than the fallback, spec §4.C).
    pub fn with_ast_plugins(config: EngineConfig, extra_plugins: Vec<Box<dyn LanguageParserPlugin>>) -> EngineResult<Self> {
        let policy = SecurityPolicy::from_options(&config.security);
        let fs = Arc::new(FileService::new(config.workspace_root.clone(), config.fs.clone(), policy)?);
        let cache = Arc::new(ArtifactCache::new(config.cache.clone()));

        let mut registry = PluginRegistry::with_defaults();
        for plugin in extra_plugins {
            registry.register(plugin);
        }
        let ast = Arc::new(AstFacade::new(registry));

        let tx = Arc::new(TransactionManager::new());

        let storage = match &config.storage_path {
            Some(path) => Some(Arc::new(DocumentStore::open(path)?)),
            None => None,
        };

        let preloader = if config.predictive.enabled {
            Some(Arc::new(Preloader::new(fs.clone(), cache.clone(), ast.clone(), config.predictive.to_preloader_config())))
        } else {
            None
        };

        Ok(Self { fs, cache, ast, tx, preloader, storage })
    }

    /// Plan and run `request` to completion, honouring `cancellation`
    /// and reporting through `progress` (spec §6's public API shape).
    /// Every file touched flows an access event to the Predictive
    /// Pre-loader when one is configured, otherwise to a no-op sink.
    #[instrument(skip(self, request, progress))]
    pub fn execute(
        &self,
        request: Request,
        cancellation: CancellationToken,
        progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    ) -> Response {
        let events: Arc<dyn AccessEventSink> = match &self.preloader {
            Some(preloader) => preloader.clone(),
            None => Arc::new(NullEventSink),
        };

        let ctx = ExecContext::new(self.fs.clone(), self.cache.clone(), self.ast.clone(), self.tx.clone(), cancellation)
            .with_events(events);

        ExecEngine::execute(&ctx, request, progress)
    }

    /// Snapshot of the shared cache's hit/miss/byte/entry counters,
    /// exposed independently of any one request's `Response` (spec §6
    /// "cache-stats surface").
    pub fn cache_stats(&self) -> CacheStatsSummary {
        let stats = self.cache.stats();
        CacheStatsSummary { hits: stats.hits, misses: stats.misses, bytes: stats.bytes, entries: stats.entries }
    }

    /// The configured Predictive Pre-loader, if enabled — exposed so a
    /// host can feed it access events directly (e.g. from a read-only
    /// "peek" path that never goes through `execute`) or inspect its
    /// adaptive resource-pressure state.
    pub fn preloader(&self) -> Option<&Arc<Preloader>> {
        self.preloader.as_ref()
    }

    /// Persist the given predictor feature-importance snapshot under
    /// `key`, when a storage path was configured (spec §6 "Persisted
    /// state"). A no-op `Ok(())` when persistence is disabled.
    pub fn save_predictor_snapshot(&self, key: &str, weights: &[f64]) -> StorageResult<()> {
        match &self.storage {
            Some(store) => store.put(Namespace::PredictorSnapshot, key, &weights),
            None => Ok(()),
        }
    }

    pub fn load_predictor_snapshot(&self, key: &str) -> StorageResult<Option<Vec<f64>>> {
        match &self.storage {
            Some(store) => store.get(Namespace::PredictorSnapshot, key),
            None => Ok(None),
        }
    }

    /// Record the warming targets a session actually benefited from, so
    /// a future process can seed `Preloader::run_strategies` from them.
    pub fn save_warming_targets(&self, session_key: &str, paths: &[String]) -> StorageResult<()> {
        match &self.storage {
            Some(store) => store.put(Namespace::WarmingTargets, session_key, &paths),
            None => Ok(()),
        }
    }

    pub fn load_warming_targets(&self, session_key: &str) -> StorageResult<Option<Vec<String>>> {
        match &self.storage {
            Some(store) => store.get(Namespace::WarmingTargets, session_key),
            None => Ok(None),
        }
    }
}
