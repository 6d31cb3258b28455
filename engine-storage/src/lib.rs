//! # engine-storage
//!
//! Optional persisted state (spec §6 "Persisted state"): predictor
//! model snapshots, warming-strategy targets, and benchmark baseline
//! documents. Nothing in the engine's request/response path requires
//! this crate — it exists purely so a long-lived host process can
//! carry predictor training and warming history across restarts.

pub mod errors;
pub mod store;

pub use errors::{StorageError, StorageResult};
pub use store::{DocumentStore, Namespace};
