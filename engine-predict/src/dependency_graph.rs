//! Workspace dependency graph (spec §4.G signal 2): built lazily via
//! AST Facade import extraction, cached behind a recency threshold so a
//! burst of predictions between file changes doesn't re-walk and
//! re-parse the whole workspace each time.
//!
//! Construction generalises the teacher's parallel call-graph build
//! (`call_graph::builder::CallGraphBuilder`: `par_iter().flat_map_iter()`
//! over parsed files) to import edges instead of call edges, and the
//! in-degree/locality queries follow `structural::coupling::cycle_detection`'s
//! use of `petgraph::Direction` over a `DiGraph<String, ()>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_ast::AstFacade;
use engine_cache::ArtifactCache;
use engine_core::collections::FxHashMap;
use engine_fs::FileService;
use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rayon::prelude::*;
use tracing::instrument;

/// Reduce a raw `use`/`import` statement's full text (as captured by a
/// plugin) to a bare dotted/colon path suitable for filesystem
/// resolution: strips the `use`/`pub use` keyword, any `as alias`, and
/// rejects group imports (`use a::{b, c}`) and self/super-relative
/// paths, which need more than a path guess to resolve correctly.
fn normalize_use(raw: &str) -> Option<String> {
    let mut s = raw.trim();
    for prefix in ["pub(crate) use ", "pub use ", "use "] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim();
            break;
        }
    }
    if s.contains('{') || s.contains("self::") || s.contains("super::") {
        return None;
    }
    let s = s.split(" as ").next().unwrap_or(s).trim();
    let s = s.strip_prefix("crate::").unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    Some(s.to_string())
}

struct GraphData {
    graph: DiGraph<PathBuf, f64>,
    node_of: FxHashMap<PathBuf, NodeIndex>,
    built_at: Instant,
}

/// Lazily (re)built, recency-cached import graph over the workspace.
pub struct DependencyGraph {
    fs: Arc<FileService>,
    ast: Arc<AstFacade>,
    cache: Arc<ArtifactCache>,
    recency: Duration,
    data: RwLock<Option<GraphData>>,
}

impl DependencyGraph {
    pub fn new(fs: Arc<FileService>, ast: Arc<AstFacade>, cache: Arc<ArtifactCache>, recency: Duration) -> Self {
        Self { fs, ast, cache, recency, data: RwLock::new(None) }
    }

    /// Force a rebuild on the next query regardless of recency.
    pub fn invalidate(&self) {
        *self.data.write() = None;
    }

    fn ensure_built(&self) {
        {
            let guard = self.data.read();
            if let Some(data) = guard.as_ref() {
                if data.built_at.elapsed() < self.recency {
                    return;
                }
            }
        }
        self.rebuild();
    }

    #[instrument(skip(self))]
    fn rebuild(&self) {
        let files = match self.fs.glob("**/*") {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "dependency graph rebuild: glob failed");
                return;
            }
        };

        let edges: Vec<(PathBuf, Vec<(PathBuf, f64)>)> = files
            .par_iter()
            .filter_map(|abs| {
                if !self.fs.stat(abs).ok()?.is_file {
                    return None;
                }
                let parsed = self.ast.parse_cached(&self.fs, &self.cache, abs).ok()?;
                let mut weights: FxHashMap<PathBuf, f64> = FxHashMap::default();
                for import in &parsed.imports {
                    let Some(module) = normalize_use(&import.module) else { continue };
                    if let Some(target) = self.resolve_import(abs, &module) {
                        *weights.entry(target).or_insert(0.0) += 1.0;
                    }
                }
                Some((abs.clone(), weights.into_iter().collect()))
            })
            .collect();

        let mut graph: DiGraph<PathBuf, f64> = DiGraph::with_capacity(files.len(), edges.len());
        let mut node_of: FxHashMap<PathBuf, NodeIndex> = FxHashMap::default();
        for abs in &files {
            let idx = graph.add_node(abs.clone());
            node_of.insert(abs.clone(), idx);
        }
        for (src, targets) in edges {
            let Some(&src_idx) = node_of.get(&src) else { continue };
            for (target, weight) in targets {
                if let Some(&dst_idx) = node_of.get(&target) {
                    graph.add_edge(src_idx, dst_idx, weight);
                }
            }
        }

        *self.data.write() = Some(GraphData { graph, node_of, built_at: Instant::now() });
    }

    /// Best-effort resolution of an import's module string to a
    /// workspace-relative-turned-absolute file path. Rust `use`-style
    /// `a::b::c` paths are tried as `a/b/c.rs` and `a/b/c/mod.rs`
    /// relative to the workspace root; anything already resembling a
    /// relative path is tried as-is and with a `.rs`/`.ts`/`.py`
    /// extension appended. Unresolvable imports (external crates,
    /// stdlib, packages) are simply dropped — they contribute no edge.
    fn resolve_import(&self, from: &Path, module: &str) -> Option<PathBuf> {
        let root = self.fs.root();
        let candidates: Vec<PathBuf> = if module.contains("::") {
            let as_path = module.replace("::", "/");
            vec![root.join(format!("{as_path}.rs")), root.join(&as_path).join("mod.rs")]
        } else {
            let rel = module.trim_start_matches("./").trim_start_matches("../");
            let parent = from.parent().unwrap_or(root);
            ["", ".rs", ".ts", ".py", ".js"]
                .iter()
                .map(|ext| parent.join(format!("{rel}{ext}")))
                .collect()
        };
        candidates.into_iter().find(|c| self.fs.exists(c).unwrap_or(false))
    }

    pub fn in_degree(&self, path: &Path) -> usize {
        self.ensure_built();
        let guard = self.data.read();
        let Some(data) = guard.as_ref() else { return 0 };
        let Some(&idx) = data.node_of.get(path) else { return 0 };
        data.graph.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn dependencies(&self, path: &Path) -> Vec<(PathBuf, f64)> {
        self.ensure_built();
        let guard = self.data.read();
        let Some(data) = guard.as_ref() else { return Vec::new() };
        let Some(&idx) = data.node_of.get(path) else { return Vec::new() };
        data.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (data.graph[e.target()].clone(), *e.weight()))
            .collect()
    }

    pub fn dependents(&self, path: &Path) -> Vec<PathBuf> {
        self.ensure_built();
        let guard = self.data.read();
        let Some(data) = guard.as_ref() else { return Vec::new() };
        let Some(&idx) = data.node_of.get(path) else { return Vec::new() };
        data.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| data.graph[e.source()].clone())
            .collect()
    }

    pub fn mean_dependency_strength(&self, path: &Path) -> f64 {
        let deps = self.dependencies(path);
        if deps.is_empty() {
            return 0.0;
        }
        deps.iter().map(|(_, w)| w).sum::<f64>() / deps.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_cache::CacheConfig;
    use engine_fs::{FileServiceConfig, SecurityPolicy};
    use tempfile::TempDir;

    fn graph(dir: &TempDir) -> DependencyGraph {
        let fs = Arc::new(FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap());
        let ast = Arc::new(AstFacade::with_defaults());
        let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
        DependencyGraph::new(fs, ast, cache, Duration::from_secs(30))
    }

    #[test]
    fn resolves_same_directory_relative_import() {
        let dir = TempDir::new().unwrap();
        let g = graph(&dir);
        g.fs.write("src/util.rs", b"pub fn helper() {}\n").unwrap();
        g.fs.write("src/main.rs", b"use util;\nfn main() {}\n").unwrap();

        let main_abs = g.fs.root().join("src/main.rs");
        let deps = g.dependencies(&main_abs);
        assert!(deps.iter().any(|(p, _)| p.ends_with("util.rs")));
    }

    #[test]
    fn in_degree_counts_dependents() {
        let dir = TempDir::new().unwrap();
        let g = graph(&dir);
        g.fs.write("src/util.rs", b"pub fn helper() {}\n").unwrap();
        g.fs.write("src/a.rs", b"use util;\n").unwrap();
        g.fs.write("src/b.rs", b"use util;\n").unwrap();

        let util_abs = g.fs.root().join("src/util.rs");
        assert_eq!(g.in_degree(&util_abs), 2);
    }

    #[test]
    fn unresolvable_import_contributes_no_edge() {
        let dir = TempDir::new().unwrap();
        let g = graph(&dir);
        g.fs.write("src/main.rs", b"use std::collections::HashMap;\n").unwrap();
        let main_abs = g.fs.root().join("src/main.rs");
        assert!(g.dependencies(&main_abs).is_empty());
    }
}
