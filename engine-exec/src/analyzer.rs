//! The `Analyze` handler (spec §4.F): read-only, returns per-file
//! matches, extracted symbols/imports/exports, and aggregated matches
//! across files. Idempotent and side-effect-free (spec §8): results
//! are served from the analyze cache slot when the fingerprint and the
//! file's version marker both match.

use std::path::Path;

use engine_core::events::AccessKind;
use engine_core::model::{AnalyzePayload, Operation, OperationKind};
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult};
use crate::fingerprint::analyze_fingerprint;
use crate::handler::OperationHandler;

#[derive(Debug, Clone, Serialize, Default)]
struct MatchEntry {
    line: usize,
    text: String,
}

#[derive(Debug, Clone, Serialize, Default)]
struct FileAnalysis {
    path: String,
    matches: Vec<MatchEntry>,
    symbols: Vec<String>,
    imports: Vec<String>,
    exports: Vec<String>,
    parse_errors: Vec<String>,
}

pub struct Analyzer;

impl OperationHandler for Analyzer {
    fn run(&self, ctx: &ExecContext, op: &Operation) -> ExecResult<serde_json::Value> {
        let OperationKind::Analyze(payload) = &op.kind else {
            return Err(ExecError::Internal("Analyzer received a non-analyze operation".into()));
        };
        if payload.paths.is_empty() {
            return Err(ExecError::Validation("analyze requires at least one path".into()));
        }

        let fingerprint = analyze_fingerprint(payload);
        let mut files = Vec::with_capacity(payload.paths.len());

        for raw_path in &payload.paths {
            if ctx.check_cancelled() {
                return Err(ExecError::Cancelled);
            }
            let abs = ctx.fs.root().join(raw_path);
            let cached = ctx.cache.get_analysis(&ctx.fs, Path::new(raw_path), &fingerprint, || {
                Ok(analyze_one(ctx, raw_path, payload)?)
            })?;
            ctx.record_access(abs, AccessKind::Analyze);
            files.push((*cached).clone());
        }

        Ok(aggregate(&payload.paths, files))
    }
}

fn analyze_one(ctx: &ExecContext, raw_path: &str, payload: &AnalyzePayload) -> ExecResult<serde_json::Value> {
    let bytes = ctx.cache.get_file(&ctx.fs, Path::new(raw_path))?;
    let text = String::from_utf8_lossy(&bytes);

    let mut matches = Vec::new();
    if let Some(search) = &payload.search {
        for (idx, line) in text.lines().enumerate() {
            if line.contains(search.as_str()) {
                matches.push(MatchEntry { line: idx + 1, text: line.to_string() });
            }
        }
    }
    if let Some(patterns) = &payload.patterns {
        for pattern in patterns {
            let Ok(re) = Regex::new(pattern) else { continue };
            for (idx, line) in text.lines().enumerate() {
                if re.is_match(line) {
                    matches.push(MatchEntry { line: idx + 1, text: line.to_string() });
                }
            }
        }
    }

    let mut analysis = FileAnalysis {
        path: raw_path.to_string(),
        matches,
        ..Default::default()
    };

    if let Some(extract) = &payload.extract {
        let parsed = ctx.ast.parse_bytes(Path::new(raw_path), &bytes)?;
        if extract.iter().any(|e| e == "symbols") {
            analysis.symbols = parsed.symbols.iter().map(|s| s.name.clone()).collect();
        }
        if extract.iter().any(|e| e == "imports") {
            analysis.imports = parsed.imports.iter().map(|i| i.module.clone()).collect();
        }
        if extract.iter().any(|e| e == "exports") {
            analysis.exports = parsed.exports.clone();
        }
        analysis.parse_errors = parsed.errors.iter().map(|e| e.message.clone()).collect();
    }

    Ok(serde_json::to_value(analysis).unwrap_or(serde_json::Value::Null))
}

fn aggregate(paths: &[String], files: Vec<serde_json::Value>) -> serde_json::Value {
    let total_matches: usize = files
        .iter()
        .map(|f| f.get("matches").and_then(|m| m.as_array()).map(|a| a.len()).unwrap_or(0))
        .sum();

    json!({
        "files": files,
        "aggregate": {
            "files_analyzed": paths.len(),
            "total_matches": total_matches,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_ast::AstFacade;
    use engine_cache::{ArtifactCache, CacheConfig};
    use engine_core::model::{OperationEnvelope, OperationKind};
    use engine_core::CancellationToken;
    use engine_fs::{FileService, FileServiceConfig, SecurityPolicy};
    use engine_tx::TransactionManager;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> ExecContext {
        let fs = Arc::new(FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap());
        let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
        let ast = Arc::new(AstFacade::with_defaults());
        let tx = Arc::new(TransactionManager::new());
        ExecContext::new(fs, cache, ast, tx, CancellationToken::new())
    }

    fn analyze_op(paths: &[&str], search: Option<&str>) -> Operation {
        Operation {
            envelope: OperationEnvelope { id: None, depends_on: vec![], transaction: None },
            kind: OperationKind::Analyze(AnalyzePayload {
                paths: paths.iter().map(|p| p.to_string()).collect(),
                search: search.map(str::to_string),
                patterns: None,
                extract: None,
            }),
        }
    }

    #[test]
    fn finds_literal_search_matches() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("m.py", b"def foo():\n    return 1\n").unwrap();

        let result = Analyzer.run(&ctx, &analyze_op(&["m.py"], Some("return"))).unwrap();
        assert_eq!(result["aggregate"]["total_matches"], 1);
    }

    #[test]
    fn is_idempotent_and_second_call_hits_cache() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("m.py", b"import os\n").unwrap();

        let op = analyze_op(&["m.py"], Some("import"));
        let first = Analyzer.run(&ctx, &op).unwrap();
        assert_eq!(ctx.cache.stats().misses, 1);
        let second = Analyzer.run(&ctx, &op).unwrap();
        assert_eq!(ctx.cache.stats().hits, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn extracts_rust_symbols() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("lib.rs", b"fn alpha() {}\n").unwrap();

        let op = Operation {
            envelope: OperationEnvelope { id: None, depends_on: vec![], transaction: None },
            kind: OperationKind::Analyze(AnalyzePayload {
                paths: vec!["lib.rs".into()],
                search: None,
                patterns: None,
                extract: Some(vec!["symbols".into()]),
            }),
        };
        let result = Analyzer.run(&ctx, &op).unwrap();
        let symbols = result["files"][0]["symbols"].as_array().unwrap();
        assert!(symbols.iter().any(|s| s == "alpha"));
    }

    #[test]
    fn missing_paths_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let err = Analyzer.run(&ctx, &analyze_op(&[], None)).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
    }
}
