//! Per-transaction undo log entries (spec §4.E).
//!
//! Each entry captures exactly enough pre-state to reverse one
//! mutation: original bytes (+ mode) to restore a file edited or
//! deleted, or just the path to unlink a file this transaction created.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum UndoAction {
    /// Restore a file's original bytes (and mode, if known). Used for
    /// edits (pre-edit content) and deletes (pre-delete content).
    RestoreFile {
        path: PathBuf,
        bytes: Vec<u8>,
        mode: Option<u32>,
    },
    /// Unlink a file this transaction created.
    RemoveFile { path: PathBuf },
}

impl UndoAction {
    pub fn path(&self) -> &PathBuf {
        match self {
            UndoAction::RestoreFile { path, .. } => path,
            UndoAction::RemoveFile { path } => path,
        }
    }
}
