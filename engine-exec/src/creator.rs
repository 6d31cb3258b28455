//! The `Create` handler (spec §4.F): writes new files, skipping
//! (and recording) any that already exist unless `overwrite` is set,
//! and recording each creation for transaction rollback.

use std::path::PathBuf;

use engine_core::events::AccessKind;
use engine_core::model::{CreatePayload, NewFile, Operation, OperationKind};
use engine_tx::UndoAction;
use serde::Serialize;
use serde_json::json;

use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult};
use crate::handler::OperationHandler;

#[derive(Debug, Clone, Serialize)]
struct CreateFileResult {
    path: String,
    created: bool,
    already_existed: bool,
}

pub struct Creator;

impl OperationHandler for Creator {
    fn run(&self, ctx: &ExecContext, op: &Operation) -> ExecResult<serde_json::Value> {
        let OperationKind::Create(payload) = &op.kind else {
            return Err(ExecError::Internal("Creator received a non-create operation".into()));
        };
        if payload.files.is_empty() {
            return Err(ExecError::Validation("create requires at least one file".into()));
        }
        let overwrite = payload.overwrite.unwrap_or(false);

        let mut results = Vec::with_capacity(payload.files.len());
        for file in &payload.files {
            if ctx.check_cancelled() {
                return Err(ExecError::Cancelled);
            }
            results.push(create_one(ctx, op, payload, file, overwrite)?);
        }

        let already_existed: Vec<&str> = results
            .iter()
            .filter(|r: &&CreateFileResult| r.already_existed)
            .map(|r| r.path.as_str())
            .collect();

        Ok(json!({ "files": results, "already_existed": already_existed }))
    }
}

fn create_one(
    ctx: &ExecContext,
    op: &Operation,
    _payload: &CreatePayload,
    file: &NewFile,
    overwrite: bool,
) -> ExecResult<CreateFileResult> {
    let exists = ctx.fs.exists(&file.path)?;
    if exists && !overwrite {
        return Ok(CreateFileResult { path: file.path.clone(), created: false, already_existed: true });
    }

    match file.encoding.as_deref() {
        None | Some("utf8") | Some("utf-8") => {}
        Some(other) => {
            return Err(ExecError::Validation(format!("unsupported encoding: {other}")));
        }
    }

    let pre_overwrite = if exists {
        let stat = ctx.fs.stat(&file.path)?;
        Some((ctx.fs.read(&file.path)?, stat.mode))
    } else {
        None
    };

    ctx.fs.write(&file.path, file.content.as_bytes())?;
    if let Some(mode) = file.mode {
        ctx.fs.chmod(&file.path, mode)?;
    }

    if let Some(tx_id) = &op.envelope.transaction {
        let undo = match pre_overwrite {
            Some((bytes, mode)) => UndoAction::RestoreFile { path: PathBuf::from(&file.path), bytes, mode },
            None => UndoAction::RemoveFile { path: PathBuf::from(&file.path) },
        };
        ctx.tx.snapshot(tx_id, undo);
    }
    ctx.record_access(ctx.fs.root().join(&file.path), AccessKind::Create);

    Ok(CreateFileResult { path: file.path.clone(), created: true, already_existed: false })
}
