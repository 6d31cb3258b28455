//! The `Edit` handler (spec §4.F): applies a per-file list of changes
//! (find/replace, line-based insert/replace/delete, offset insert,
//! AST-guided rewrite), respecting `dry_run` and `create_backup`, and
//! snapshotting pre-content for transaction rollback before any write.

use std::path::{Path, PathBuf};

use engine_core::events::AccessKind;
use engine_core::model::{ChangeOp, EditPayload, FileChange, Operation, OperationKind};
use engine_tx::UndoAction;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult};
use crate::handler::OperationHandler;

#[derive(Debug, Clone, Serialize, Default)]
struct FileEditResult {
    file: String,
    changes_applied: usize,
    dry_run: bool,
    backup_path: Option<String>,
    syntax_errors: Vec<String>,
}

pub struct Editor;

impl OperationHandler for Editor {
    fn run(&self, ctx: &ExecContext, op: &Operation) -> ExecResult<serde_json::Value> {
        let OperationKind::Edit(payload) = &op.kind else {
            return Err(ExecError::Internal("Editor received a non-edit operation".into()));
        };
        if payload.edits.is_empty() {
            return Err(ExecError::Validation("edit requires at least one file entry".into()));
        }

        let dry_run = payload.dry_run.unwrap_or(false);
        let mut results = Vec::with_capacity(payload.edits.len());

        for file_edit in &payload.edits {
            if ctx.check_cancelled() {
                return Err(ExecError::Cancelled);
            }
            results.push(edit_one(ctx, op, payload, &file_edit.file, &file_edit.changes, dry_run)?);
        }

        let total_changes: usize = results.iter().map(|r: &FileEditResult| r.changes_applied).sum();
        Ok(json!({ "edits": results, "total_changes": total_changes }))
    }
}

fn edit_one(
    ctx: &ExecContext,
    op: &Operation,
    payload: &EditPayload,
    raw_path: &str,
    changes: &[FileChange],
    dry_run: bool,
) -> ExecResult<FileEditResult> {
    let path = Path::new(raw_path);
    let original = ctx.fs.read(path)?;
    let original_text = String::from_utf8_lossy(&original).into_owned();

    let (new_text, applied) = apply_changes(ctx, path, &original_text, changes);

    let mut backup_path = None;
    if !dry_run {
        if let Some(tx_id) = &op.envelope.transaction {
            let mode = ctx.fs.stat(path).ok().and_then(|s| s.mode);
            ctx.tx.snapshot(
                tx_id,
                UndoAction::RestoreFile { path: PathBuf::from(raw_path), bytes: original.clone(), mode },
            );
        }
        if payload.create_backup.unwrap_or(false) {
            let backup = format!("{raw_path}.bak");
            ctx.fs.write(&backup, &original)?;
            backup_path = Some(backup);
        }
        ctx.fs.write(path, new_text.as_bytes())?;
        ctx.record_access(ctx.fs.root().join(raw_path), AccessKind::Edit);
    }

    let syntax_errors = ctx
        .ast
        .parse_bytes(path, new_text.as_bytes())
        .map(|parsed| parsed.errors.into_iter().map(|e| e.message).collect())
        .unwrap_or_default();

    Ok(FileEditResult {
        file: raw_path.to_string(),
        changes_applied: applied,
        dry_run,
        backup_path,
        syntax_errors,
    })
}

fn apply_changes(ctx: &ExecContext, path: &Path, content: &str, changes: &[FileChange]) -> (String, usize) {
    let mut text = content.to_string();
    let mut applied = 0usize;

    for change in changes {
        let op = change.op.unwrap_or(ChangeOp::FindReplace);
        match op {
            ChangeOp::FindReplace => {
                let Some(find) = &change.find else { continue };
                let replace = change.replace.clone().unwrap_or_default();
                if change.regex.unwrap_or(false) {
                    if let Ok(re) = Regex::new(find) {
                        let count = re.find_iter(&text).count();
                        if count > 0 {
                            text = re.replace_all(&text, replace.as_str()).into_owned();
                            applied += count;
                        }
                    }
                } else {
                    let count = text.matches(find.as_str()).count();
                    if count > 0 {
                        text = text.replace(find.as_str(), &replace);
                        applied += count;
                    }
                }
            }
            ChangeOp::InsertLine => {
                if let Some(line) = change.line {
                    let content = change.content.clone().unwrap_or_default();
                    let mut lines: Vec<&str> = text.split('\n').collect();
                    let idx = line.saturating_sub(1).min(lines.len());
                    lines.insert(idx, content.as_str());
                    text = lines.join("\n");
                    applied += 1;
                }
            }
            ChangeOp::ReplaceLine => {
                if let Some(line) = change.line {
                    let end = change.line_end.unwrap_or(line);
                    let content = change.content.clone().unwrap_or_default();
                    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
                    let start_idx = line.saturating_sub(1);
                    let end_idx = end.saturating_sub(1).min(lines.len().saturating_sub(1));
                    if start_idx < lines.len() && start_idx <= end_idx {
                        lines.splice(start_idx..=end_idx, [content]);
                        text = lines.join("\n");
                        applied += 1;
                    }
                }
            }
            ChangeOp::DeleteLine => {
                if let Some(line) = change.line {
                    let end = change.line_end.unwrap_or(line);
                    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
                    let start_idx = line.saturating_sub(1);
                    let end_idx = end.saturating_sub(1).min(lines.len().saturating_sub(1));
                    if start_idx < lines.len() && start_idx <= end_idx {
                        lines.drain(start_idx..=end_idx);
                        text = lines.join("\n");
                        applied += 1;
                    }
                }
            }
            ChangeOp::InsertOffset => {
                if let Some(offset) = change.offset {
                    let content = change.content.clone().unwrap_or_default();
                    let mut boundary = offset.min(text.len());
                    while boundary > 0 && !text.is_char_boundary(boundary) {
                        boundary -= 1;
                    }
                    text.insert_str(boundary, &content);
                    applied += 1;
                }
            }
            ChangeOp::AstRewrite => {
                let Some(symbol_name) = &change.find else { continue };
                let content = change.content.clone().unwrap_or_default();
                if let Ok(parsed) = ctx.ast.parse_bytes(path, text.as_bytes()) {
                    if let Some(symbol) = parsed.symbols.iter().find(|s| &s.name == symbol_name) {
                        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
                        let idx = symbol.line.saturating_sub(1);
                        if idx < lines.len() {
                            lines[idx] = content;
                            text = lines.join("\n");
                            applied += 1;
                        }
                    }
                }
            }
        }
    }

    (text, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_ast::AstFacade;
    use engine_cache::{ArtifactCache, CacheConfig};
    use engine_core::model::{EditPayload, FileEdit, OperationEnvelope, OperationKind};
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

    fn edit_op(file: &str, change: FileChange, dry_run: bool) -> Operation {
        Operation {
            envelope: OperationEnvelope { id: None, depends_on: vec![], transaction: None },
            kind: OperationKind::Edit(EditPayload {
                edits: vec![FileEdit { file: file.to_string(), changes: vec![change] }],
                dry_run: Some(dry_run),
                create_backup: None,
            }),
        }
    }

    #[test]
    fn dry_run_leaves_bytes_unchanged_but_counts_changes() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("x.ts", b"let a = foo;\n").unwrap();

        let change = FileChange {
            find: Some("foo".into()),
            replace: Some("bar".into()),
            ..Default::default()
        };
        let result = Editor.run(&ctx, &edit_op("x.ts", change, true)).unwrap();
        assert_eq!(result["total_changes"], 1);
        assert_eq!(ctx.fs.read("x.ts").unwrap(), b"let a = foo;\n".to_vec());
    }

    #[test]
    fn non_dry_run_writes_and_matches_dry_run_count() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("x.ts", b"let a = foo;\n").unwrap();

        let change = FileChange {
            find: Some("foo".into()),
            replace: Some("bar".into()),
            ..Default::default()
        };
        let result = Editor.run(&ctx, &edit_op("x.ts", change, false)).unwrap();
        assert_eq!(result["total_changes"], 1);
        assert_eq!(ctx.fs.read("x.ts").unwrap(), b"let a = bar;\n".to_vec());
    }

    #[test]
    fn create_backup_leaves_bak_file_in_place() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("x.ts", b"one\n").unwrap();

        let op = Operation {
            envelope: OperationEnvelope { id: None, depends_on: vec![], transaction: None },
            kind: OperationKind::Edit(EditPayload {
                edits: vec![FileEdit {
                    file: "x.ts".into(),
                    changes: vec![FileChange { find: Some("one".into()), replace: Some("two".into()), ..Default::default() }],
                }],
                dry_run: None,
                create_backup: Some(true),
            }),
        };
        Editor.run(&ctx, &op).unwrap();
        assert_eq!(ctx.fs.read("x.ts.bak").unwrap(), b"one\n".to_vec());
    }

    #[test]
    fn insert_line_shifts_existing_lines_down() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("f.txt", b"a\nb\n").unwrap();

        let change = FileChange {
            op: Some(ChangeOp::InsertLine),
            line: Some(2),
            content: Some("x".into()),
            ..Default::default()
        };
        Editor.run(&ctx, &edit_op("f.txt", change, false)).unwrap();
        assert_eq!(ctx.fs.read("f.txt").unwrap(), b"a\nx\nb\n".to_vec());
    }

    #[test]
    fn delete_line_range_removes_lines() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.fs.write("f.txt", b"a\nb\nc\n").unwrap();

        let change = FileChange {
            op: Some(ChangeOp::DeleteLine),
            line: Some(2),
            line_end: Some(2),
            ..Default::default()
        };
        Editor.run(&ctx, &edit_op("f.txt", change, false)).unwrap();
        assert_eq!(ctx.fs.read("f.txt").unwrap(), b"a\nc\n".to_vec());
    }
}
