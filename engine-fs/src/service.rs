//! `FileService` — the only layer permitted to touch the filesystem
//! (spec §4.A). A thin, stateless façade parameterised by the
//! workspace root (spec §9 "Ownership of state").

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::instrument;

use crate::config::FileServiceConfig;
use crate::errors::{FsError, FsResult};
use crate::path::resolve;
use crate::security::SecurityPolicy;

#[derive(Debug, Clone)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
    pub modified: SystemTime,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Path-validated, atomic I/O over a rooted workspace.
pub struct FileService {
    root: PathBuf,
    config: FileServiceConfig,
    policy: SecurityPolicy,
}

impl FileService {
    pub fn new(root: impl Into<PathBuf>, config: FileServiceConfig, policy: SecurityPolicy) -> FsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root, config, policy })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve and security-check `path`, without touching the filesystem.
    fn checked(&self, path: impl AsRef<Path>) -> FsResult<PathBuf> {
        let resolved = resolve(&self.root, path.as_ref())?;
        if !self.policy.is_allowed(&resolved) {
            return Err(FsError::Blocked(path.as_ref().display().to_string()));
        }
        Ok(resolved)
    }

    #[instrument(skip(self))]
    pub fn read(&self, path: impl AsRef<Path> + std::fmt::Debug) -> FsResult<Vec<u8>> {
        let abs = self.checked(path.as_ref())?;
        if !abs.exists() {
            return Err(FsError::NotFound(path.as_ref().display().to_string()));
        }
        fs::read(&abs).map_err(|e| io_error(e, &abs))
    }

    /// Atomic write: write to a sibling temp file, then rename. Creates
    /// missing parent directories first (spec §4.A).
    #[instrument(skip(self, bytes))]
    pub fn write(&self, path: impl AsRef<Path> + std::fmt::Debug, bytes: &[u8]) -> FsResult<()> {
        let abs = self.checked(path.as_ref())?;
        if bytes.len() as u64 > self.config.effective_max_file_size() {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file exceeds max_file_size",
            )));
        }
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(e, parent))?;
        }

        let parent = abs.parent().unwrap_or(&self.root);
        let tmp_name = format!(".{}.tmp-{}", file_name_or(&abs, "file"), std::process::id());
        let tmp_path = parent.join(tmp_name);

        {
            let mut f = fs::File::create(&tmp_path).map_err(|e| io_error(e, &tmp_path))?;
            f.write_all(bytes).map_err(|e| io_error(e, &tmp_path))?;
            f.sync_all().map_err(|e| io_error(e, &tmp_path))?;
        }

        fs::rename(&tmp_path, &abs).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_error(e, &abs)
        })?;

        Ok(())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> FsResult<bool> {
        let abs = self.checked(path)?;
        Ok(abs.exists())
    }

    pub fn stat(&self, path: impl AsRef<Path>) -> FsResult<FileStat> {
        let abs = self.checked(path.as_ref())?;
        let meta = fs::metadata(&abs).map_err(|e| io_error(e, &abs))?;
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            Some(meta.permissions().mode())
        };
        #[cfg(not(unix))]
        let mode = None;
        Ok(FileStat {
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            mode,
        })
    }

    #[cfg(unix)]
    pub fn chmod(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<()> {
        use std::os::unix::fs::PermissionsExt;
        let abs = self.checked(path)?;
        let perms = fs::Permissions::from_mode(mode);
        fs::set_permissions(&abs, perms).map_err(|e| io_error(e, &abs))
    }

    #[cfg(not(unix))]
    pub fn chmod(&self, path: impl AsRef<Path>, _mode: u32) -> FsResult<()> {
        let _ = self.checked(path)?;
        Ok(())
    }

    pub fn unlink(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let abs = self.checked(path.as_ref())?;
        if !abs.exists() {
            return Err(FsError::NotFound(path.as_ref().display().to_string()));
        }
        fs::remove_file(&abs).map_err(|e| io_error(e, &abs))
    }

    pub fn readdir(&self, path: impl AsRef<Path> + std::fmt::Debug) -> FsResult<Vec<DirEntry>> {
        let abs = self.checked(path.as_ref())?;
        let mut out = Vec::new();
        for entry in fs::read_dir(&abs).map_err(|e| io_error(e, &abs))? {
            let entry = entry.map_err(|e| io_error(e, &abs))?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Remove a directory; fails if non-empty.
    pub fn rmdir(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let abs = self.checked(path)?;
        fs::remove_dir(&abs).map_err(|e| io_error(e, &abs))
    }

    /// Remove a directory only if it's empty; never errors on non-empty
    /// (used by `Delete { remove_empty_dirs: true }`, spec §4.F).
    pub fn rmdir_if_empty(&self, path: impl AsRef<Path>) -> FsResult<bool> {
        let abs = self.checked(path)?;
        match fs::read_dir(&abs) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Ok(false);
                }
            }
            Err(_) => return Ok(false),
        }
        fs::remove_dir(&abs).map_err(|e| io_error(e, &abs))?;
        Ok(true)
    }

    /// Glob scoped to the workspace: the pattern is applied as a
    /// gitignore-style whitelist override over a recursive walk of the
    /// workspace root, the same `ignore::WalkBuilder` +
    /// `ignore::overrides::OverrideBuilder` idiom the teacher uses for
    /// directory discovery, respecting `.gitignore` and a
    /// `.engineignore` override file. Every match is re-checked against
    /// the security policy (spec §4.A, §6).
    #[instrument(skip(self))]
    pub fn glob(&self, pattern: &str) -> FsResult<Vec<PathBuf>> {
        let mut overrides = ignore::overrides::OverrideBuilder::new(&self.root);
        overrides.add(pattern)?;
        let built = overrides.build()?;

        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .add_custom_ignore_filename(".engineignore")
            .overrides(built);

        let mut out = Vec::new();
        for entry in builder.build() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.into_path();
            let canonical = path.canonicalize().unwrap_or(path);
            if canonical.starts_with(&self.root) && self.policy.is_allowed(&canonical) {
                out.push(canonical);
            }
        }
        out.sort();
        Ok(out)
    }
}

fn file_name_or<'a>(path: &'a Path, default: &'a str) -> std::borrow::Cow<'a, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or(std::borrow::Cow::Borrowed(default))
}

fn io_error(e: std::io::Error, path: &Path) -> FsError {
    match e.kind() {
        std::io::ErrorKind::NotFound => FsError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.display().to_string()),
        _ => FsError::Io(e),
    }
}
