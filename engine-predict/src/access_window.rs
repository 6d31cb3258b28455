//! Recent-access signal source (spec §4.G signal 1): a sliding-window
//! list of `{path, op, timestamp, session}`, trimmed by age. Append-only
//! under a short-held exclusive lock with periodic trimming (spec §5
//! "Access-pattern buffer" shared-resource note), mirroring the
//! teacher's event-driven `workspace::context` refresh rather than a
//! TTL'd snapshot.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use engine_core::events::{AccessKind, AccessPatternEvent};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub path: PathBuf,
    pub op: AccessKind,
    pub timestamp: SystemTime,
    pub session: Option<String>,
}

/// Bounded by both age and length so a quiet workspace's window empties
/// out naturally and a very chatty one doesn't grow unbounded between
/// trims.
pub struct AccessWindow {
    max_age: Duration,
    max_len: usize,
    records: Mutex<VecDeque<AccessRecord>>,
}

impl AccessWindow {
    pub fn new(max_age: Duration, max_len: usize) -> Self {
        Self { max_age, max_len, records: Mutex::new(VecDeque::new()) }
    }

    pub fn record(&self, event: &AccessPatternEvent) {
        let mut records = self.records.lock();
        records.push_back(AccessRecord {
            path: event.abs_path.clone(),
            op: event.op_kind,
            timestamp: event.timestamp,
            session: event.session_id.clone(),
        });
        while records.len() > self.max_len {
            records.pop_front();
        }
        self.trim_locked(&mut records, SystemTime::now());
    }

    fn trim_locked(&self, records: &mut VecDeque<AccessRecord>, now: SystemTime) {
        while let Some(front) = records.front() {
            match now.duration_since(front.timestamp) {
                Ok(age) if age > self.max_age => {
                    records.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Manually trigger a trim pass (called by the adaptive controller's
    /// periodic sample, not just on every `record`).
    pub fn trim(&self) {
        let mut records = self.records.lock();
        self.trim_locked(&mut records, SystemTime::now());
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently accessed distinct paths, newest first.
    pub fn recent_paths(&self, limit: usize) -> Vec<PathBuf> {
        let records = self.records.lock();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(limit);
        for record in records.iter().rev() {
            if seen.insert(record.path.clone()) {
                out.push(record.path.clone());
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    pub fn last_access(&self, path: &Path) -> Option<SystemTime> {
        self.records.lock().iter().rev().find(|r| r.path == path).map(|r| r.timestamp)
    }

    /// Raw count of accesses to `path` currently in the window.
    pub fn frequency(&self, path: &Path) -> usize {
        self.records.lock().iter().filter(|r| r.path == path).count()
    }

    /// Distinct paths in the window sharing `dir` as their parent.
    pub fn same_directory(&self, dir: &Path) -> Vec<PathBuf> {
        let records = self.records.lock();
        let mut seen = std::collections::HashSet::new();
        records
            .iter()
            .filter(|r| r.path.parent() == Some(dir))
            .filter(|r| seen.insert(r.path.clone()))
            .map(|r| r.path.clone())
            .collect()
    }
}
