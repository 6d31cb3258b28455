//! The `Validate` handler (spec §4.F): runs syntax/lint/custom checks
//! per file, optionally applies auto-fixes. Auto-fixes are applied
//! through the [`crate::editor::Editor`] path so transaction semantics
//! (pre-state snapshot, rollback-on-failure) apply to them exactly as
//! they do to a normal edit (spec §4.F "Validate" bullet).
//!
//! `commands` (external shell/tool invocations) are accepted in the
//! payload but not executed: running arbitrary commands is the
//! sandboxed code evaluator's job, an explicit out-of-scope
//! collaborator (spec §1). Each requested command is reported back as
//! a skipped diagnostic rather than silently dropped.

use std::path::Path;

use engine_core::model::{
    ChangeOp, EditPayload, FileChange, FileEdit, Operation, OperationEnvelope, OperationKind,
    ValidatePayload,
};
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::context::ExecContext;
use crate::editor::Editor;
use crate::errors::{ExecError, ExecResult};
use crate::handler::OperationHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
struct Diagnostic {
    check: &'static str,
    severity: Severity,
    message: String,
    line: Option<usize>,
    fixable: bool,
}

#[derive(Debug, Clone, Serialize)]
struct FileValidation {
    file: String,
    diagnostics: Vec<Diagnostic>,
    fixed: bool,
}

pub struct Validator;

impl OperationHandler for Validator {
    fn run(&self, ctx: &ExecContext, op: &Operation) -> ExecResult<serde_json::Value> {
        let OperationKind::Validate(payload) = &op.kind else {
            return Err(ExecError::Internal("Validator received a non-validate operation".into()));
        };

        let files = payload.files.clone().unwrap_or_default();
        let checks = effective_checks(payload);
        let fix = payload.fix.unwrap_or(false);

        let mut results = Vec::with_capacity(files.len());
        for raw_path in &files {
            if ctx.check_cancelled() {
                return Err(ExecError::Cancelled);
            }
            results.push(validate_one(ctx, op, raw_path, &checks, fix)?);
        }

        let command_diagnostics: Vec<Diagnostic> = payload
            .commands
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|cmd| Diagnostic {
                check: "command",
                severity: Severity::Info,
                message: format!("command '{cmd}' not executed: sandboxed evaluation is out of core scope"),
                line: None,
                fixable: false,
            })
            .collect();

        let total_errors: usize = results
            .iter()
            .map(|r: &FileValidation| r.diagnostics.iter().filter(|d| d.severity == Severity::Error).count())
            .sum();

        Ok(json!({
            "files": results,
            "commands": command_diagnostics,
            "passed": total_errors == 0,
            "total_errors": total_errors,
        }))
    }
}

fn effective_checks(payload: &ValidatePayload) -> Vec<String> {
    payload
        .checks
        .clone()
        .unwrap_or_else(|| vec!["syntax".to_string(), "lint".to_string()])
}

fn validate_one(
    ctx: &ExecContext,
    op: &Operation,
    raw_path: &str,
    checks: &[String],
    fix: bool,
) -> ExecResult<FileValidation> {
    let path = Path::new(raw_path);
    let bytes = ctx.fs.read(path)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let mut diagnostics = Vec::new();
    if checks.iter().any(|c| c == "syntax") {
        diagnostics.extend(syntax_check(ctx, path, &bytes));
    }
    if checks.iter().any(|c| c == "lint") {
        diagnostics.extend(lint_check(&text));
    }

    let mut fixed = false;
    if fix && diagnostics.iter().any(|d| d.fixable) {
        fixed = apply_trailing_whitespace_fix(ctx, op, raw_path)?;
        if fixed {
            diagnostics.retain(|d| d.check != "lint" || !d.fixable);
        }
    }

    Ok(FileValidation { file: raw_path.to_string(), diagnostics, fixed })
}

fn syntax_check(ctx: &ExecContext, path: &Path, bytes: &[u8]) -> Vec<Diagnostic> {
    match ctx.ast.parse_bytes(path, bytes) {
        Ok(parsed) => parsed
            .errors
            .into_iter()
            .map(|e| Diagnostic {
                check: "syntax",
                severity: Severity::Error,
                message: e.message,
                line: e.line,
                fixable: false,
            })
            .collect(),
        Err(e) => vec![Diagnostic {
            check: "syntax",
            severity: Severity::Warning,
            message: e.to_string(),
            line: None,
            fixable: false,
        }],
    }
}

fn lint_check(text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line != line.trim_end() {
            diagnostics.push(Diagnostic {
                check: "lint",
                severity: Severity::Warning,
                message: "trailing whitespace".to_string(),
                line: Some(idx + 1),
                fixable: true,
            });
        }
    }
    diagnostics
}

/// Route the trailing-whitespace auto-fix through [`Editor`] so a
/// transactional `Validate { fix: true }` snapshots and rolls back the
/// same way any other mutating operation does.
fn apply_trailing_whitespace_fix(ctx: &ExecContext, op: &Operation, raw_path: &str) -> ExecResult<bool> {
    let fix_op = Operation {
        envelope: OperationEnvelope {
            id: op.envelope.id.clone(),
            depends_on: Vec::new(),
            transaction: op.envelope.transaction.clone(),
        },
        kind: OperationKind::Edit(EditPayload {
            edits: vec![FileEdit {
                file: raw_path.to_string(),
                changes: vec![FileChange {
                    find: Some(r"[ \t]+$".to_string()),
                    replace: Some(String::new()),
                    regex: Some(true),
                    op: Some(ChangeOp::FindReplace),
                    ..Default::default()
                }],
            }],
            dry_run: Some(false),
            create_backup: None,
        }),
    };

    let result = Editor.run(ctx, &fix_op)?;
    let changed = result["total_changes"].as_u64().unwrap_or(0);
    Ok(changed > 0)
}

/// Regex used only to size-check compilation at startup in tests below;
/// the real pattern lives inline in `apply_trailing_whitespace_fix`.
#[cfg(test)]
fn trailing_ws_regex_compiles() -> bool {
    Regex::new(r"[ \t]+$").is_ok()
}
