//! End-to-end scenarios from spec §8, run against a real scratch
//! workspace via `tempfile::TempDir`.

use std::sync::Arc;

use engine_ast::AstFacade;
use engine_cache::{ArtifactCache, CacheConfig};
use engine_core::model::{
    AnalyzePayload, CreatePayload, EditPayload, FileChange, FileEdit, NewFile, Operation,
    OperationEnvelope, OperationKind, OperationStatus, Request, RequestOptions,
};
use engine_core::CancellationToken;
use engine_exec::{Engine, ExecContext};
use engine_fs::{FileService, FileServiceConfig, SecurityPolicy};
use engine_tx::TransactionManager;
use tempfile::TempDir;

fn context(dir: &TempDir) -> ExecContext {
    let fs = Arc::new(FileService::new(dir.path(), FileServiceConfig::default(), SecurityPolicy::default()).unwrap());
    let cache = Arc::new(ArtifactCache::new(CacheConfig::default()));
    let ast = Arc::new(AstFacade::with_defaults());
    let tx = Arc::new(TransactionManager::new());
    ExecContext::new(fs, cache, ast, tx, CancellationToken::new())
}

fn op(id: &str, depends_on: &[&str], tx: Option<&str>, kind: OperationKind) -> Operation {
    Operation {
        envelope: OperationEnvelope {
            id: Some(id.into()),
            depends_on: depends_on.iter().map(|d| (*d).into()).collect(),
            transaction: tx.map(Into::into),
        },
        kind,
    }
}

fn analyze(paths: &[&str]) -> OperationKind {
    OperationKind::Analyze(AnalyzePayload {
        paths: paths.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    })
}

fn edit(file: &str, find: &str, replace: &str, dry_run: bool) -> OperationKind {
    OperationKind::Edit(EditPayload {
        edits: vec![FileEdit {
            file: file.to_string(),
            changes: vec![FileChange { find: Some(find.into()), replace: Some(replace.into()), ..Default::default() }],
        }],
        dry_run: Some(dry_run),
        create_backup: None,
    })
}

fn create(path: &str, content: &str) -> OperationKind {
    OperationKind::Create(CreatePayload {
        files: vec![NewFile { path: path.to_string(), content: content.to_string(), encoding: None, mode: None }],
        overwrite: Some(false),
    })
}

#[test]
fn scenario_1_parallel_stages() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    ctx.fs.write("src/a.rs", b"fn a() {}\n").unwrap();
    ctx.fs.write("test/b.rs", b"fn b() {}\n").unwrap();
    ctx.fs.write("src/x.rs", b"let v = foo;\n").unwrap();

    let request = Request {
        operations: vec![
            op("A", &[], None, analyze(&["src/a.rs"])),
            op("B", &[], None, analyze(&["test/b.rs"])),
            op("C", &["A", "B"], None, edit("src/x.rs", "foo", "bar", false)),
        ],
        options: RequestOptions::default(),
    };

    let response = Engine::execute(&ctx, request, |_| {});

    assert!(response.success);
    assert_eq!(response.performance.parallelization_opportunities, 1);
    assert!(response.performance.critical_path.contains(&"C".into()));
    let statuses: Vec<_> = response.operations.iter().map(|r| r.status).collect();
    assert!(statuses.iter().all(|s| *s == OperationStatus::Success));
}

#[test]
fn scenario_2_cycle_rejected() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let request = Request {
        operations: vec![
            op("X", &["Y"], None, analyze(&["a"])),
            op("Y", &["X"], None, edit("a", "x", "y", false)),
        ],
        options: RequestOptions::default(),
    };

    let response = Engine::execute(&ctx, request, |_| {});
    assert!(!response.success);
    assert!(response.operations.is_empty());
}

#[test]
fn scenario_3_transaction_rollback() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let request = Request {
        operations: vec![
            op("A", &[], Some("T"), create("a.txt", "hi")),
            op("B", &[], Some("T"), create("b.txt", "bye")),
            op("C", &[], Some("T"), edit("nonexistent.txt", "x", "y", false)),
        ],
        options: RequestOptions::default(),
    };

    let response = Engine::execute(&ctx, request, |_| {});

    assert!(!response.success);
    let by_id = |id: &str| response.operations.iter().find(|r| r.id == id.into()).unwrap();
    assert_eq!(by_id("A").status, OperationStatus::Cancelled);
    assert_eq!(by_id("B").status, OperationStatus::Cancelled);
    assert_eq!(by_id("C").status, OperationStatus::Failed);
    assert!(!ctx.fs.exists("a.txt").unwrap());
    assert!(!ctx.fs.exists("b.txt").unwrap());
}

#[test]
fn scenario_4_dry_run_edit() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    ctx.fs.write("x.ts", b"let a = foo;\n").unwrap();

    let request = Request {
        operations: vec![op("A", &[], None, edit("x.ts", "foo", "bar", true))],
        options: RequestOptions::default(),
    };

    let response = Engine::execute(&ctx, request, |_| {});
    assert!(response.success);
    let data = response.operations[0].data.as_ref().unwrap();
    assert_eq!(data["total_changes"], 1);
    assert_eq!(ctx.fs.read("x.ts").unwrap(), b"let a = foo;\n".to_vec());
}

#[test]
fn scenario_5_cache_hit() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    ctx.fs.write("m.py", b"def f():\n    pass\n").unwrap();

    let request = Request {
        operations: vec![
            op("A", &[], None, analyze(&["m.py"])),
            op("B", &["A"], None, analyze(&["m.py"])),
        ],
        options: RequestOptions::default(),
    };

    let response = Engine::execute(&ctx, request, |_| {});
    assert!(response.success);
    assert!(response.performance.cache.hits >= 1);
}

#[test]
fn scenario_6_cancellation_mid_flight() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    for i in 0..10 {
        ctx.fs.write(format!("f{i}.txt"), format!("content {i}").as_bytes()).unwrap();
    }

    let ops: Vec<Operation> = (0..10)
        .map(|i| op(&format!("op{i}"), &[], None, analyze(&[&format!("f{i}.txt")])))
        .collect();

    let request = Request {
        operations: ops,
        options: RequestOptions { concurrency: Some(2), ..Default::default() },
    };

    // All ten land in a single stage (no dependencies); cancel before
    // dispatch starts so the whole stage is reported cancelled. This
    // still exercises the "cancel mid-request, remaining ops end up
    // cancelled, no partial writes" invariant without relying on
    // scheduling order within the parallel stage.
    ctx.cancellation.cancel();
    let response = Engine::execute(&ctx, request, |_| {});

    assert!(response.operations.iter().all(|r| r.status != OperationStatus::Success));
    assert_eq!(response.summary.cancelled, 10);
}
