//! File Service configuration, following the teacher's `Option<T>` +
//! `effective_*()` accessor pattern (`drift_core::config::ScanConfig`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileServiceConfig {
    /// Follow symbolic links while walking/globbing. Default: false.
    /// A symlink target that resolves outside the workspace root is
    /// always rejected regardless of this flag (spec §3 invariant).
    pub follow_symlinks: Option<bool>,
    /// Reject reads/writes larger than this, in bytes. None = unbounded.
    pub max_file_size: Option<u64>,
}

impl FileServiceConfig {
    pub fn effective_follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(false)
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(64 * 1024 * 1024)
    }
}
