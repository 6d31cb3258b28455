//! The `Delete` handler (spec §4.F): expands glob patterns via File
//! Service, unlinks each resolved path that exists, snapshots for
//! transaction rollback, and optionally removes now-empty parent
//! directories.

use std::path::{Path, PathBuf};

use engine_core::events::AccessKind;
use engine_core::model::{DeletePayload, Operation, OperationKind};
use engine_tx::UndoAction;
use serde::Serialize;
use serde_json::json;

use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult};
use crate::handler::OperationHandler;

#[derive(Debug, Clone, Serialize)]
struct DeletedFile {
    path: String,
}

pub struct Deleter;

impl OperationHandler for Deleter {
    fn run(&self, ctx: &ExecContext, op: &Operation) -> ExecResult<serde_json::Value> {
        let OperationKind::Delete(payload) = &op.kind else {
            return Err(ExecError::Internal("Deleter received a non-delete operation".into()));
        };
        if payload.paths.is_empty() {
            return Err(ExecError::Validation("delete requires at least one path or glob".into()));
        }

        let mut resolved: Vec<String> = Vec::new();
        for raw in &payload.paths {
            if has_glob_meta(raw) {
                for abs in ctx.fs.glob(raw)? {
                    resolved.push(relative_to_root(ctx, &abs));
                }
            } else {
                resolved.push(raw.clone());
            }
        }
        resolved.sort();
        resolved.dedup();

        let mut deleted = Vec::new();
        let mut parent_dirs: Vec<PathBuf> = Vec::new();

        for raw_path in &resolved {
            if ctx.check_cancelled() {
                return Err(ExecError::Cancelled);
            }
            let path = Path::new(raw_path);
            if !ctx.fs.exists(path)? {
                continue;
            }

            let stat = ctx.fs.stat(path)?;
            let bytes = ctx.fs.read(path)?;

            if let Some(tx_id) = &op.envelope.transaction {
                ctx.tx.snapshot(
                    tx_id,
                    UndoAction::RestoreFile { path: path.to_path_buf(), bytes, mode: stat.mode },
                );
            }

            ctx.fs.unlink(path)?;
            ctx.record_access(ctx.fs.root().join(raw_path), AccessKind::Delete);
            deleted.push(DeletedFile { path: raw_path.clone() });
            if let Some(parent) = path.parent() {
                parent_dirs.push(parent.to_path_buf());
            }
        }

        let mut removed_dirs = Vec::new();
        if payload.remove_empty_dirs.unwrap_or(false) {
            parent_dirs.sort();
            parent_dirs.dedup();
            for dir in parent_dirs {
                if dir.as_os_str().is_empty() {
                    continue;
                }
                if ctx.fs.rmdir_if_empty(&dir).unwrap_or(false) {
                    removed_dirs.push(dir.display().to_string());
                }
            }
        }

        Ok(json!({
            "deleted": deleted,
            "deleted_count": deleted.len(),
            "removed_empty_dirs": removed_dirs,
        }))
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', ']'])
}

fn relative_to_root(ctx: &ExecContext, abs: &Path) -> String {
    abs.strip_prefix(ctx.fs.root())
        .unwrap_or(abs)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_ast::AstFacade;
    use engine_cache::{ArtifactCache, CacheConfig};
    use engine_core::model::{DeletePayload, OperationEnvelope, OperationKind};
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

    fn delete_op(paths: &[&str], remove_empty_dirs: bool) -> Operation {
        Operation {
            envelope: OperationEnvelope { id: None, depends_on: vec![], transaction: None },
            kind: OperationKind::Delete(DeletePayload {
                paths: paths.iter().map(|p| p.to_string()).collect(),
                remove_empty_dirs: Some(remove_empty_dirs),
            }),
        }
    }

    #[test]
    fn deletes_existing_file() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("a.txt", b"x").unwrap();

        let result = Deleter.run(&ctx, &delete_op(&["a.txt"], false)).unwrap();
        assert_eq!(result["deleted_count"], 1);
        assert!(!ctx.fs.exists("a.txt").unwrap());
    }

    #[test]
    fn missing_path_is_skipped_not_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let result = Deleter.run(&ctx, &delete_op(&["missing.txt"], false)).unwrap();
        assert_eq!(result["deleted_count"], 0);
    }

    #[test]
    fn glob_pattern_expands_to_matching_files() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("src/a.rs", b"").unwrap();
        ctx.fs.write("src/b.rs", b"").unwrap();
        ctx.fs.write("src/c.txt", b"").unwrap();

        let result = Deleter.run(&ctx, &delete_op(&["src/*.rs"], false)).unwrap();
        assert_eq!(result["deleted_count"], 2);
        assert!(ctx.fs.exists("src/c.txt").unwrap());
    }

    #[test]
    fn remove_empty_dirs_cleans_up_parent() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("d/only.txt", b"x").unwrap();

        let result = Deleter.run(&ctx, &delete_op(&["d/only.txt"], true)).unwrap();
        let removed = result["removed_empty_dirs"].as_array().unwrap();
        assert_eq!(removed.len(), 1);
    }
}
