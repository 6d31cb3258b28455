//! `Preloader` — the Predictive Pre-loader's orchestrator (spec §4.G):
//! ingests access events, assembles a candidate set, scores it with
//! the configured [`Predictor`], and issues resource-gated background
//! `Cache.get` calls. Never blocks the caller and never surfaces an
//! error (spec §3 invariant: "Predictor never blocks on its own I/O").

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use engine_ast::AstFacade;
use engine_cache::ArtifactCache;
use engine_core::events::{AccessEventSink, AccessPatternEvent};
use engine_fs::FileService;
use tracing::instrument;

use crate::access_window::AccessWindow;
use crate::adaptive_config::{AdaptiveConfig, ResourceSample};
use crate::dependency_graph::DependencyGraph;
use crate::features;
use crate::predictor::{EnsemblePredictor, Predictor};
use crate::warming::{WarmingSources, WarmingStrategy, WarmingTrigger};

#[derive(Debug, Clone)]
pub struct PreloaderConfig {
    pub access_window_max_age: Duration,
    pub access_window_max_len: usize,
    pub dependency_graph_recency: Duration,
    pub max_candidates: usize,
    pub strategies: Vec<WarmingStrategy>,
}

impl Default for PreloaderConfig {
    fn default() -> Self {
        Self {
            access_window_max_age: Duration::from_secs(3600),
            access_window_max_len: 5_000,
            dependency_graph_recency: Duration::from_secs(30),
            max_candidates: 64,
            strategies: crate::warming::default_strategies(),
        }
    }
}

/// Ties the three signal sources, the scoring predictor, the adaptive
/// resource gate, and the warming-strategy list into one
/// [`AccessEventSink`] the Execution Engine can feed directly.
pub struct Preloader {
    fs: Arc<FileService>,
    cache: Arc<ArtifactCache>,
    window: Arc<AccessWindow>,
    deps: Arc<DependencyGraph>,
    predictor: Arc<dyn Predictor>,
    adaptive: Arc<AdaptiveConfig>,
    sources: WarmingSources,
    strategies: Vec<WarmingStrategy>,
    max_candidates: usize,
    in_flight: Arc<AtomicUsize>,
}

impl Preloader {
    pub fn new(fs: Arc<FileService>, cache: Arc<ArtifactCache>, ast: Arc<AstFacade>, config: PreloaderConfig) -> Self {
        Self::with_predictor(fs, cache, ast, config, Arc::new(EnsemblePredictor::default_trio()))
    }

    pub fn with_predictor(
        fs: Arc<FileService>,
        cache: Arc<ArtifactCache>,
        ast: Arc<AstFacade>,
        config: PreloaderConfig,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        let window = Arc::new(AccessWindow::new(config.access_window_max_age, config.access_window_max_len));
        let deps = Arc::new(DependencyGraph::new(fs.clone(), ast, cache.clone(), config.dependency_graph_recency));
        let sources = WarmingSources::new(fs.clone(), deps.clone(), window.clone());
        Self {
            fs,
            cache,
            window,
            deps,
            predictor,
            adaptive: Arc::new(AdaptiveConfig::default()),
            sources,
            strategies: config.strategies,
            max_candidates: config.max_candidates,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn adaptive_config(&self) -> &Arc<AdaptiveConfig> {
        &self.adaptive
    }

    pub fn access_window(&self) -> &Arc<AccessWindow> {
        &self.window
    }

    pub fn dependency_graph(&self) -> &Arc<DependencyGraph> {
        &self.deps
    }

    fn candidate_set(&self, trigger: &Path) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut candidates = Vec::new();

        let push_all = |paths: Vec<PathBuf>, seen: &mut HashSet<PathBuf>, candidates: &mut Vec<PathBuf>| {
            for path in paths {
                if path != trigger && seen.insert(path.clone()) {
                    candidates.push(path);
                }
            }
        };

        push_all(self.window.recent_paths(32), &mut seen, &mut candidates);
        if let Some(dir) = trigger.parent() {
            push_all(self.window.same_directory(dir), &mut seen, &mut candidates);
        }
        push_all(self.deps.dependencies(trigger).into_iter().map(|(p, _)| p).collect(), &mut seen, &mut candidates);
        push_all(self.deps.dependents(trigger), &mut seen, &mut candidates);

        candidates.truncate(self.max_candidates);
        candidates
    }

    /// Run the full prediction pipeline for trigger file `f` (spec
    /// §4.G steps 1-4): assemble candidates, score them, keep those
    /// above the adaptive threshold, and warm the survivors subject to
    /// the resource gate.
    #[instrument(skip(self))]
    pub fn predict_and_warm(&self, trigger: &Path) {
        let settings = self.adaptive.settings();
        if !settings.background_loading_enabled {
            return;
        }

        let now = SystemTime::now();
        let candidates = self.candidate_set(trigger);
        let selected: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|candidate| {
                let vector = features::extract(candidate, trigger, &self.window, &self.deps, now);
                self.predictor.predict(&vector) >= settings.prediction_threshold
            })
            .collect();

        for path in selected {
            self.warm_one(path, settings.max_concurrent_loads);
        }
    }

    /// Fire every registered warming strategy matching `trigger`, in
    /// priority order (spec §4.G "Warming strategies").
    #[instrument(skip(self))]
    pub fn run_strategies(&self, trigger: WarmingTrigger) {
        let settings = self.adaptive.settings();
        if !settings.background_loading_enabled {
            return;
        }

        let mut ordered: Vec<&WarmingStrategy> =
            self.strategies.iter().filter(|s| s.trigger == trigger).collect();
        ordered.sort_by_key(|s| s.priority);

        for strategy in ordered {
            for path in self.sources.candidates(strategy) {
                self.warm_one(path, settings.max_concurrent_loads);
            }
        }
    }

    /// Resource-gated, best-effort, non-blocking single warm: if under
    /// the concurrent-load cap, spawn a background `Cache.get`; errors
    /// are logged and never surfaced (spec §4.G step 4).
    fn warm_one(&self, path: PathBuf, max_concurrent_loads: usize) {
        if self.in_flight.load(Ordering::Relaxed) >= max_concurrent_loads {
            return;
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let fs = self.fs.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();

        rayon::spawn(move || {
            if let Err(error) = cache.get_file(&fs, &path) {
                tracing::debug!(path = %path.display(), %error, "predictive warm: load failed, ignored");
            }
            in_flight.fetch_sub(1, Ordering::Relaxed);
        });
    }

    /// Current memory-pressure signal derived from the cache's own
    /// byte budget, for feeding into [`AdaptiveConfig::resample`].
    pub fn memory_pressure(&self) -> f64 {
        let stats = self.cache.stats();
        if stats.bytes == 0 {
            return 0.0;
        }
        // `CacheStatsSnapshot` doesn't carry the configured ceiling;
        // the caller (engine facade, which owns `CacheConfig`) is
        // expected to call `resample` directly with the true ratio.
        // This fallback treats any non-zero usage as light pressure.
        (stats.bytes as f64 / (256.0 * 1024.0 * 1024.0)).min(1.0)
    }

    /// CPU/concurrency pressure proxy: in-flight warm loads relative
    /// to the currently configured ceiling.
    pub fn cpu_pressure(&self) -> f64 {
        let ceiling = self.adaptive.settings().max_concurrent_loads.max(1);
        self.in_flight.load(Ordering::Relaxed) as f64 / ceiling as f64
    }

    /// Resample the adaptive controller from this preloader's own
    /// signals. Callers with a better memory-pressure signal (e.g. the
    /// `engine` facade, which knows `CacheConfig::max_bytes`) should
    /// call `adaptive_config().resample` directly instead.
    pub fn resample_adaptive_config(&self) {
        self.adaptive.resample(ResourceSample {
            memory_pressure: self.memory_pressure(),
            cpu_pressure: self.cpu_pressure(),
        });
    }
}

impl AccessEventSink for Preloader {
    fn record(&self, event: AccessPatternEvent) {
        self.window.record(&event);
        self.predict_and_warm(&event.abs_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_cache::CacheConfig;
    use engine_core::events::AccessKind;
    use engine_fs::{FileServiceConfig, SecurityPolicy};
    use tempfile::TempDir;

    fn preloader(dir: &TempDir) -> Preloader {
        let fs = Arc::new(FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap());
        let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
        let ast = Arc::new(AstFacade::with_defaults());
        Preloader::new(fs, cache, ast, PreloaderConfig::default())
    }

    #[test]
    fn candidate_set_excludes_the_trigger_itself() {
        let dir = TempDir::new().unwrap();
        let p = preloader(&dir);
        p.fs.write("src/a.rs", b"fn a() {}\n").unwrap();
        let trigger = p.fs.root().join("src/a.rs");
        p.window.record(&AccessPatternEvent {
            abs_path: trigger.clone(),
            timestamp: SystemTime::now(),
            op_kind: AccessKind::Analyze,
            session_id: None,
            context: None,
        });
        assert!(!p.candidate_set(&trigger).contains(&trigger));
    }

    #[test]
    fn record_feeds_window_without_blocking() {
        let dir = TempDir::new().unwrap();
        let p = preloader(&dir);
        p.fs.write("src/a.rs", b"fn a() {}\n").unwrap();
        let path = p.fs.root().join("src/a.rs");
        p.record(AccessPatternEvent {
            abs_path: path.clone(),
            timestamp: SystemTime::now(),
            op_kind: AccessKind::Analyze,
            session_id: None,
            context: None,
        });
        assert_eq!(p.window.frequency(&path), 1);
    }

    #[test]
    fn high_pressure_disables_warming_without_erroring() {
        let dir = TempDir::new().unwrap();
        let p = preloader(&dir);
        p.adaptive.resample(ResourceSample { memory_pressure: 0.99, cpu_pressure: 0.99 });
        p.fs.write("src/a.rs", b"fn a() {}\n").unwrap();
        // Should be a no-op, not a panic, with background loading off.
        p.predict_and_warm(&p.fs.root().join("src/a.rs"));
    }

    #[test]
    fn run_strategies_warms_entry_points_on_startup() {
        let dir = TempDir::new().unwrap();
        let p = preloader(&dir);
        p.fs.write("src/main.rs", b"fn main() {}\n").unwrap();
        p.run_strategies(WarmingTrigger::Startup);
        std::thread::sleep(Duration::from_millis(50));
        let stats = p.cache.stats();
        assert!(stats.hits + stats.misses >= 1);
    }
}
