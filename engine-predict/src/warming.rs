//! Warming strategies (spec §4.G "Warming strategies"): a configurable
//! ordered list, each producing at most `max_files` candidate paths
//! when its trigger fires, fed into the same resource-gated loader the
//! prediction pipeline uses.

use std::path::PathBuf;
use std::sync::Arc;

use engine_fs::FileService;
use serde::{Deserialize, Serialize};

use crate::access_window::AccessWindow;
use crate::dependency_graph::DependencyGraph;
use crate::features::ENTRY_POINT_NAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarmingTrigger {
    Startup,
    Dependency,
    Pattern,
    GitHistory,
    Manual,
}

/// One entry in the ordered strategy list (spec §4.G shape: `{name,
/// priority, trigger, max_files, ...}`). Lower `priority` runs first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmingStrategy {
    pub name: String,
    pub priority: i32,
    pub trigger: WarmingTrigger,
    pub max_files: usize,
}

impl WarmingStrategy {
    pub fn new(name: impl Into<String>, priority: i32, trigger: WarmingTrigger, max_files: usize) -> Self {
        Self { name: name.into(), priority, trigger, max_files }
    }
}

/// The default ordered list: entry points at startup, high-in-degree
/// dependencies once the graph exists, then recent-access locality —
/// git-history co-modification is available as a trigger but ships
/// with no default strategy since it needs an external change log
/// (spec §4.G signal 3, "optional").
pub fn default_strategies() -> Vec<WarmingStrategy> {
    vec![
        WarmingStrategy::new("entry-points", 0, WarmingTrigger::Startup, 16),
        WarmingStrategy::new("core-dependencies", 10, WarmingTrigger::Dependency, 32),
        WarmingStrategy::new("recent-locality", 20, WarmingTrigger::Pattern, 32),
    ]
}

/// Produces the candidate set for one strategy, given the trigger
/// that's firing. Each source is independent and best-effort; a
/// source that can't answer (e.g. an empty dependency graph on a
/// brand new workspace) just yields an empty `Vec`.
pub struct WarmingSources {
    fs: Arc<FileService>,
    deps: Arc<DependencyGraph>,
    window: Arc<AccessWindow>,
}

impl WarmingSources {
    pub fn new(fs: Arc<FileService>, deps: Arc<DependencyGraph>, window: Arc<AccessWindow>) -> Self {
        Self { fs, deps, window }
    }

    /// Candidates for one strategy, ordered by relevance and capped at
    /// `strategy.max_files`.
    pub fn candidates(&self, strategy: &WarmingStrategy) -> Vec<PathBuf> {
        let raw = match strategy.trigger {
            WarmingTrigger::Startup => self.entry_points(),
            WarmingTrigger::Dependency => self.core_dependencies(),
            WarmingTrigger::Pattern => self.window.recent_paths(strategy.max_files * 2),
            WarmingTrigger::GitHistory => Vec::new(),
            WarmingTrigger::Manual => Vec::new(),
        };
        raw.into_iter().take(strategy.max_files).collect()
    }

    fn entry_points(&self) -> Vec<PathBuf> {
        let Ok(files) = self.fs.glob("**/*") else { return Vec::new() };
        files
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| ENTRY_POINT_NAMES.contains(&n))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn core_dependencies(&self) -> Vec<PathBuf> {
        let Ok(files) = self.fs.glob("**/*") else { return Vec::new() };
        let mut ranked: Vec<(PathBuf, usize)> =
            files.into_iter().map(|p| { let d = self.deps.in_degree(&p); (p, d) }).filter(|(_, d)| *d > 0).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(p, _)| p).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_ast::AstFacade;
    use engine_cache::{ArtifactCache, CacheConfig};
    use engine_fs::{FileServiceConfig, SecurityPolicy};
    use std::time::Duration;
    use tempfile::TempDir;

    fn sources(dir: &TempDir) -> WarmingSources {
        let fs = Arc::new(FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap());
        let ast = Arc::new(AstFacade::with_defaults());
        let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
        let deps = Arc::new(DependencyGraph::new(fs.clone(), ast, cache, Duration::from_secs(30)));
        let window = Arc::new(AccessWindow::new(Duration::from_secs(3600), 1000));
        WarmingSources::new(fs, deps, window)
    }

    #[test]
    fn startup_strategy_finds_entry_points() {
        let dir = TempDir::new().unwrap();
        let s = sources(&dir);
        s.fs.write("src/main.rs", b"fn main() {}\n").unwrap();
        s.fs.write("src/util.rs", b"pub fn helper() {}\n").unwrap();

        let strategy = WarmingStrategy::new("entry-points", 0, WarmingTrigger::Startup, 16);
        let candidates = s.candidates(&strategy);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].ends_with("main.rs"));
    }

    #[test]
    fn dependency_strategy_ranks_by_in_degree() {
        let dir = TempDir::new().unwrap();
        let s = sources(&dir);
        s.fs.write("src/util.rs", b"pub fn helper() {}\n").unwrap();
        s.fs.write("src/a.rs", b"use util;\n").unwrap();
        s.fs.write("src/b.rs", b"use util;\n").unwrap();

        let strategy = WarmingStrategy::new("core-dependencies", 10, WarmingTrigger::Dependency, 4);
        let candidates = s.candidates(&strategy);
        assert!(candidates.first().map(|p| p.ends_with("util.rs")).unwrap_or(false));
    }

    #[test]
    fn pattern_strategy_respects_max_files_cap() {
        let dir = TempDir::new().unwrap();
        let s = sources(&dir);
        for name in ["a.rs", "b.rs", "c.rs"] {
            s.window.record(&engine_core::events::AccessPatternEvent {
                abs_path: dir.path().join(name),
                timestamp: std::time::SystemTime::now(),
                op_kind: engine_core::events::AccessKind::Analyze,
                session_id: None,
                context: None,
            });
        }
        let strategy = WarmingStrategy::new("recent-locality", 20, WarmingTrigger::Pattern, 2);
        assert_eq!(s.candidates(&strategy).len(), 2);
    }

    #[test]
    fn git_history_trigger_has_no_default_source() {
        let dir = TempDir::new().unwrap();
        let s = sources(&dir);
        let strategy = WarmingStrategy::new("co-modified", 30, WarmingTrigger::GitHistory, 16);
        assert!(s.candidates(&strategy).is_empty());
    }
}
