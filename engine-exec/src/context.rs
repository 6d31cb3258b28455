//! `ExecContext` — the resources every operation handler needs,
//! bundled once per request (spec §9 "Ownership of state": the Engine
//! owns the Planner output and TransactionManager per request; Cache
//! and AST Facade are shared singletons for the engine's lifetime,
//! passed in by reference here).

use std::sync::Arc;
use std::time::SystemTime;

use engine_ast::AstFacade;
use engine_cache::ArtifactCache;
use engine_core::events::{AccessEventSink, AccessKind, AccessPatternEvent};
use engine_core::{CancellationToken, NullEventSink};
use engine_fs::FileService;
use engine_tx::TransactionManager;

pub struct ExecContext {
    pub fs: Arc<FileService>,
    pub cache: Arc<ArtifactCache>,
    pub ast: Arc<AstFacade>,
    pub tx: Arc<TransactionManager>,
    pub cancellation: CancellationToken,
    pub events: Arc<dyn AccessEventSink>,
    pub session_id: Option<String>,
}

impl ExecContext {
    pub fn new(
        fs: Arc<FileService>,
        cache: Arc<ArtifactCache>,
        ast: Arc<AstFacade>,
        tx: Arc<TransactionManager>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            fs,
            cache,
            ast,
            tx,
            cancellation,
            events: Arc::new(NullEventSink),
            session_id: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn AccessEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Every suspension point is also a cancellation check (spec §5).
    pub fn check_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Feed one access event to the configured sink (spec §3, §9's
    /// "access-event ingestion hook"). Best-effort and non-blocking by
    /// contract of `AccessEventSink`.
    pub fn record_access(&self, abs_path: std::path::PathBuf, op_kind: AccessKind) {
        self.events.record(AccessPatternEvent {
            abs_path,
            timestamp: SystemTime::now(),
            op_kind,
            session_id: self.session_id.clone(),
            context: None,
        });
    }
}
