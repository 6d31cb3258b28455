//! `AstFacade` (spec §4.C): picks a plugin for `path`, parses (or
//! serves the memoized result from [`engine_cache::ArtifactCache`]),
//! and returns the uniform [`ParseResult`].

use std::path::Path;

use engine_cache::ArtifactCache;
use engine_fs::FileService;
use tracing::instrument;

use crate::errors::{AstError, AstResult};
use crate::plugin::LanguageParserPlugin;
use crate::plugins::{PlainTextPlugin, RustPlugin};
use crate::types::ParseResult;

/// Ordered set of registered plugins, selected by most-specific
/// extension match, tie-broken by declared capability richness (spec
/// §4.C). The plain-text plugin is always registered last so a more
/// specific plugin always wins when both claim a path.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LanguageParserPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// The default registry: the reference Rust plugin plus the
    /// plain-text fallback, which always matches.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RustPlugin::new()));
        registry.register(Box::new(PlainTextPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn LanguageParserPlugin>) {
        self.plugins.push(plugin);
    }

    /// Select the best plugin for `path`: among every plugin whose
    /// `supports()` returns true, prefer the one with the most specific
    /// extension match (longest claimed extension matching the path's
    /// suffix), tie-broken by capability richness.
    pub fn select(&self, path: &Path, content: Option<&[u8]>) -> Option<&dyn LanguageParserPlugin> {
        let file_name = path.file_name()?.to_str()?.to_ascii_lowercase();

        let mut best: Option<(&dyn LanguageParserPlugin, usize, u8)> = None;
        for plugin in &self.plugins {
            if !plugin.supports(path, content) {
                continue;
            }
            let specificity = plugin
                .extensions()
                .iter()
                .filter(|ext| file_name.ends_with(ext.as_ref()))
                .map(|ext| ext.len())
                .max()
                .unwrap_or(0);
            let richness = plugin.capabilities().richness();

            let better = match best {
                None => true,
                Some((_, best_specificity, best_richness)) => {
                    (specificity, richness) > (best_specificity, best_richness)
                }
            };
            if better {
                best = Some((plugin.as_ref(), specificity, richness));
            }
        }
        best.map(|(plugin, _, _)| plugin)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

pub struct AstFacade {
    registry: PluginRegistry,
}

impl AstFacade {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn with_defaults() -> Self {
        Self::new(PluginRegistry::with_defaults())
    }

    /// Parse `path`'s content directly, bypassing the cache. Used by
    /// callers that already hold fresh bytes (e.g. the execution
    /// engine's edit preview) and don't want a stale cached parse.
    pub fn parse_bytes(&self, path: &Path, content: &[u8]) -> AstResult<ParseResult> {
        let plugin = self
            .registry
            .select(path, Some(content))
            .ok_or_else(|| AstError::Unsupported(path.display().to_string()))?;
        Ok(plugin.parse(content, path))
    }

    /// Parse `path` through the cache: a fresh parse is only run when
    /// the cached entry is missing or the file's version marker has
    /// changed (spec §4.C memoization).
    #[instrument(skip(self, fs, cache))]
    pub fn parse_cached(
        &self,
        fs: &FileService,
        cache: &ArtifactCache,
        path: &Path,
    ) -> AstResult<ParseResult> {
        let content = fs.read(path)?;
        let plugin = self
            .registry
            .select(path, Some(&content))
            .ok_or_else(|| AstError::Unsupported(path.display().to_string()))?;

        let json = cache.get_ast(fs, path, || {
            let result = plugin.parse(&content, path);
            Ok(serde_json::to_value(&result).unwrap_or(serde_json::Value::Null))
        })?;

        serde_json::from_value((*json).clone())
            .map_err(|e| AstError::Unsupported(format!("{}: corrupt cached AST ({e})", path.display())))
    }
}

impl Default for AstFacade {
    fn default() -> Self {
        Self::with_defaults()
    }
}
