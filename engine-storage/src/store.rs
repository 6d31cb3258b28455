//! `DocumentStore` — a small `rusqlite`-backed key/value store for the
//! engine's three optional persisted artifacts (spec §6 "Persisted
//! state"): predictor model snapshots, warming-strategy targets, and
//! benchmark baseline documents. Modeled on the teacher's
//! `drift-storage::engine` + `workspace::init` pair, but collapsed to
//! one `kv_documents` table of self-describing JSON rather than a
//! bespoke schema per artifact — engine core persists nothing
//! mandatory, so a single generic table is enough to outlive a process
//! restart without committing to per-artifact migrations.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::errors::{StorageError, StorageResult};

/// The three persisted-artifact kinds spec §6 names, used as the
/// `namespace` column so callers can't typo a collision between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    PredictorSnapshot,
    WarmingTargets,
    BenchmarkBaseline,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::PredictorSnapshot => "predictor_snapshot",
            Namespace::WarmingTargets => "warming_targets",
            Namespace::BenchmarkBaseline => "benchmark_baseline",
        }
    }
}

pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open (creating if absent) a file-backed store, applying the
    /// teacher's WAL + NORMAL-synchronous pragma pair
    /// (`workspace::migration::initialize_workspace_db`).
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS kv_documents (
                 namespace  TEXT NOT NULL,
                 key        TEXT NOT NULL,
                 value      TEXT NOT NULL,
                 updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                 PRIMARY KEY (namespace, key)
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    #[instrument(skip(self, value))]
    pub fn put<T: Serialize>(&self, namespace: Namespace, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string(value).map_err(StorageError::Corrupt)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_documents (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![namespace.as_str(), key, json],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get<T: DeserializeOwned>(&self, namespace: Namespace, key: &str) -> StorageResult<Option<T>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_documents WHERE namespace = ?1 AND key = ?2",
                params![namespace.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, namespace: Namespace, key: &str) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM kv_documents WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
        )?;
        Ok(())
    }

    /// Every key currently stored under `namespace`, for enumerating
    /// e.g. all warming-target snapshots across sessions.
    pub fn list_keys(&self, namespace: Namespace) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv_documents WHERE namespace = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![namespace.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
