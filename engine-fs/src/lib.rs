//! # engine-fs
//!
//! File Service (spec §4.A): the only layer that touches the
//! filesystem. Every path is canonicalised and checked against the
//! workspace root and the security allow/deny policy before any
//! syscall; writes are atomic via temp-then-rename.

pub mod config;
pub mod errors;
pub mod path;
pub mod security;
pub mod service;

pub use config::FileServiceConfig;
pub use errors::FsError;
pub use security::SecurityPolicy;
pub use service::{DirEntry, FileService, FileStat};
