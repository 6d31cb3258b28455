//! `TransactionManager` (spec §4.E): per-group pre-state capture and
//! rollback. Generalises the teacher's
//! `workspace::destructive::perform_destructive_operation` + `workspace::backup`
//! pair — pre-state capture before a mutation, then reverse-order undo
//! on failure — scoped per transaction tag rather than per whole-workspace
//! destructive call, and kept in memory since rollback must be instant
//! and request-scoped.
//!
//! State is partitioned by transaction id: only operations of one `tx`
//! contend on its undo log (spec §5 "Shared resources").

use std::sync::Arc;

use dashmap::DashMap;
use engine_core::ids::TransactionId;
use engine_fs::FileService;
use parking_lot::Mutex;
use tracing::instrument;

use crate::errors::{TxError, TxResult};
use crate::log::UndoAction;

#[derive(Debug, Default)]
pub struct RollbackReport {
    pub restored: Vec<std::path::PathBuf>,
    /// Undo steps that themselves failed. Logged, never surfaced as the
    /// triggering error (spec §4.E "best-effort").
    pub failures: Vec<(std::path::PathBuf, String)>,
}

#[derive(Default)]
pub struct TransactionManager {
    logs: DashMap<TransactionId, Arc<Mutex<Vec<UndoAction>>>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or resume) a transactional group's undo log.
    #[instrument(skip(self))]
    pub fn begin(&self, tx_id: &TransactionId) {
        self.logs
            .entry(tx_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));
    }

    /// Record pre-state for an upcoming mutation, called by the
    /// execution engine before it applies the change (spec §4.E).
    /// Auto-begins the group if `snapshot` arrives before `begin`.
    #[instrument(skip(self, action))]
    pub fn snapshot(&self, tx_id: &TransactionId, action: UndoAction) {
        let log = self
            .logs
            .entry(tx_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();
        log.lock().push(action);
    }

    /// Discard a group's captured state: its operations all succeeded.
    #[instrument(skip(self))]
    pub fn commit(&self, tx_id: &TransactionId) {
        self.logs.remove(tx_id);
    }

    /// Replay undo operations in reverse order using File Service. An
    /// individual undo failure is recorded in the report but never
    /// aborts the rest of the replay or masks the triggering error
    /// (spec §4.E, §7 propagation policy).
    #[instrument(skip(self, fs))]
    pub fn rollback(&self, tx_id: &TransactionId, fs: &FileService) -> TxResult<RollbackReport> {
        let Some((_, log)) = self.logs.remove(tx_id) else {
            return Err(TxError::NotFound(tx_id.to_string()));
        };

        let actions = std::mem::take(&mut *log.lock());
        let mut report = RollbackReport::default();

        for action in actions.into_iter().rev() {
            let path = action.path().clone();
            let outcome = match &action {
                UndoAction::RestoreFile { path, bytes, mode } => fs.write(path, bytes).and_then(|_| {
                    if let Some(mode) = mode {
                        fs.chmod(path, *mode)
                    } else {
                        Ok(())
                    }
                }),
                UndoAction::RemoveFile { path } => match fs.unlink(path) {
                    Ok(()) => Ok(()),
                    Err(engine_fs::FsError::NotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                },
            };

            match outcome {
                Ok(()) => report.restored.push(path),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "rollback step failed");
                    report.failures.push((path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Whether a group currently has any captured undo state.
    pub fn is_active(&self, tx_id: &TransactionId) -> bool {
        self.logs.contains_key(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_fs::{FileServiceConfig, SecurityPolicy};
    use tempfile::TempDir;

    fn fs(dir: &TempDir) -> FileService {
        FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap()
    }

    #[test]
    fn rollback_restores_edited_file_and_removes_created_file() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"original").unwrap();

        let mgr = TransactionManager::new();
        let tx = TransactionId::from("T1");
        mgr.begin(&tx);

        // Simulate: edit a.txt (snapshot original bytes, then mutate).
        mgr.snapshot(
            &tx,
            UndoAction::RestoreFile {
                path: "a.txt".into(),
                bytes: b"original".to_vec(),
                mode: None,
            },
        );
        service.write("a.txt", b"edited").unwrap();

        // Simulate: create b.txt (snapshot its path for removal).
        service.write("b.txt", b"new").unwrap();
        mgr.snapshot(&tx, UndoAction::RemoveFile { path: "b.txt".into() });

        let report = mgr.rollback(&tx, &service).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(service.read("a.txt").unwrap(), b"original".to_vec());
        assert!(!service.exists("b.txt").unwrap());
    }

    #[test]
    fn commit_discards_log_without_undoing() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"v1").unwrap();

        let mgr = TransactionManager::new();
        let tx = TransactionId::from("T1");
        mgr.begin(&tx);
        mgr.snapshot(
            &tx,
            UndoAction::RestoreFile { path: "a.txt".into(), bytes: b"v1".to_vec(), mode: None },
        );
        service.write("a.txt", b"v2").unwrap();
        mgr.commit(&tx);

        assert!(!mgr.is_active(&tx));
        assert_eq!(service.read("a.txt").unwrap(), b"v2".to_vec());
    }

    #[test]
    fn independent_transactions_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        service.write("a.txt", b"a").unwrap();
        service.write("b.txt", b"b").unwrap();

        let mgr = TransactionManager::new();
        let t1 = TransactionId::from("T1");
        let t2 = TransactionId::from("T2");
        mgr.begin(&t1);
        mgr.begin(&t2);
        mgr.snapshot(&t1, UndoAction::RestoreFile { path: "a.txt".into(), bytes: b"a".to_vec(), mode: None });
        mgr.snapshot(&t2, UndoAction::RestoreFile { path: "b.txt".into(), bytes: b"b".to_vec(), mode: None });

        service.write("a.txt", b"a2").unwrap();
        service.write("b.txt", b"b2").unwrap();

        mgr.rollback(&t1, &service).unwrap();
        assert_eq!(service.read("a.txt").unwrap(), b"a".to_vec());
        assert_eq!(service.read("b.txt").unwrap(), b"b2".to_vec());
        assert!(mgr.is_active(&t2));
    }

    #[test]
    fn rollback_unknown_transaction_is_not_found() {
        let dir = TempDir::new().unwrap();
        let service = fs(&dir);
        let mgr = TransactionManager::new();
        let err = mgr.rollback(&TransactionId::from("ghost"), &service).unwrap_err();
        assert!(matches!(err, TxError::NotFound(_)));
    }
}
