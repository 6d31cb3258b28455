//! Cache key/value/entry types (spec §3 "Cache entry").

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use engine_fs::FileStat;

/// Which kind of artifact a cache slot holds, so an `analyze` read and
/// an `ast` parse of the same path never collide (spec §4.C keys
/// parsed ASTs under `"ast:"+path`, generalised here to a namespace
/// discriminant rather than string concatenation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    File,
    Ast,
    /// Aggregated analyze results, keyed additionally by an operation
    /// fingerprint so two different `search`/`patterns` over the same
    /// file never collide (spec §4.F "cache key (analyze, abs_path, op
    /// fingerprint)").
    Analysis,
}

/// `path` is always the real filesystem path, used for version-marker
/// freshness checks; `discriminator` distinguishes multiple cache slots
/// for the same path within a namespace (e.g. an analyze fingerprint).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub path: PathBuf,
    pub discriminator: Option<String>,
}

impl CacheKey {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { namespace: Namespace::File, path: path.into(), discriminator: None }
    }

    pub fn ast(path: impl Into<PathBuf>) -> Self {
        Self { namespace: Namespace::Ast, path: path.into(), discriminator: None }
    }

    pub fn analysis(path: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self { namespace: Namespace::Analysis, path: path.into(), discriminator: Some(fingerprint.into()) }
    }
}

/// `(mtime, size)` pair used to detect staleness (spec GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMarker {
    pub mtime_nanos: u128,
    pub size: u64,
}

impl VersionMarker {
    pub fn from_stat(stat: &FileStat) -> Self {
        let mtime_nanos = stat
            .modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self { mtime_nanos, size: stat.size }
    }
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    FileArtifact(Arc<Vec<u8>>),
    ParsedAst(Arc<serde_json::Value>),
    AnalysisResult(Arc<serde_json::Value>),
}

impl CacheValue {
    pub fn size_bytes(&self) -> u64 {
        match self {
            CacheValue::FileArtifact(bytes) => bytes.len() as u64,
            CacheValue::ParsedAst(json) => json.to_string().len() as u64,
            CacheValue::AnalysisResult(json) => json.to_string().len() as u64,
        }
    }

    pub fn as_file_artifact(&self) -> Option<&Arc<Vec<u8>>> {
        match self {
            CacheValue::FileArtifact(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_analysis_result(&self) -> Option<&Arc<serde_json::Value>> {
        match self {
            CacheValue::AnalysisResult(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_parsed_ast(&self) -> Option<&Arc<serde_json::Value>> {
        match self {
            CacheValue::ParsedAst(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub version: VersionMarker,
    pub size_bytes: u64,
    pub inserted_at: Instant,
    pub last_access: Instant,
}

impl CacheEntry {
    pub fn new(value: CacheValue, version: VersionMarker) -> Self {
        let now = Instant::now();
        let size_bytes = value.size_bytes();
        Self {
            value,
            version,
            size_bytes,
            inserted_at: now,
            last_access: now,
        }
    }

    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}
