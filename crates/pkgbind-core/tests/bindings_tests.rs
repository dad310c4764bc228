mod common;

use common::TestContext;
use pkgbind_core::testing::CommitScript;
use pkgbind_core::{
    BridgeConfig, Engine, EngineError, Host, HostError, PkgBindings, Pool, ProbeMode, RepoInfo,
    SolverFlags, TransactBy,
};
use pkgbind_core::pool::{Fate, SelStatus};
use pkgbind_core::report::{
    DownloadProgressReport, InstallReport, MediaChangeReport, MediaRequest, ReportHub,
};
use pkgbind_core::testing::MemoryEngine;
use pkgbind_schema::{
    CommitRequest, CommitResult, Edition, MediaAction, ProblemAction, ReportError, ResKind,
    Resolvable, UpgradeStatistics, Value,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use url::Url;

fn fate(ctx: &TestContext, name: &str) -> Fate {
    ctx.bindings
        .pool()
        .get(ResKind::Package, name)
        .expect("package in pool")
        .fate()
}

fn int(map: &Value, key: &str) -> i64 {
    map.get(key)
        .and_then(Value::as_integer)
        .unwrap_or_else(|| panic!("missing {key} in {map}"))
}

#[test]
fn test_download_progress_is_throttled() {
    let ctx = TestContext::new();
    ctx.register("CallbackProgressDownload", "Download::Progress");
    ctx.host.reply("Download::Progress", Value::Bool(true));

    let url = Url::parse("http://download.example.org/oss/zypper.rpm").expect("valid url");
    let report = ctx.engine.reports().download_progress();
    report.start(&url, Path::new("/tmp/zypper.rpm"));
    for value in [0, 3, 4, 5, 99, 100] {
        assert!(report.progress(value, &url, 0.0, 0.0));
    }

    let forwarded: Vec<Value> = ctx
        .host
        .calls_to("Download::Progress")
        .into_iter()
        .map(|args| args[0].clone())
        .collect();
    assert_eq!(
        forwarded,
        vec![Value::Integer(5), Value::Integer(99), Value::Integer(100)]
    );
}

#[test]
fn test_download_problem_unknown_reply_aborts() {
    let ctx = TestContext::new();
    ctx.register("CallbackDoneProvide", "Download::Problem");
    ctx.host.reply("Download::Problem", "X".into());

    let url = Url::parse("http://download.example.org/oss/repodata/repomd.xml").expect("valid url");
    let action = ctx
        .engine
        .reports()
        .download_progress()
        .problem(&url, ReportError::Io, "connection reset");

    assert_eq!(action, ProblemAction::Abort);
    assert_eq!(ctx.host.calls_to("Download::Problem").len(), 1);
}

#[test]
fn test_install_then_neutral() {
    let ctx = TestContext::new();
    assert_eq!(ctx.call("PkgInstall", &["zypper".into()]), Value::Bool(true));
    {
        let pool = ctx.bindings.pool();
        let zypper = pool.get(ResKind::Package, "zypper").expect("zypper in pool");
        assert_eq!(zypper.fate(), Fate::ToInstall);
        assert_eq!(zypper.transact_by(), Some(TransactBy::ApplHigh));
    }

    assert_eq!(ctx.call("PkgNeutral", &["zypper".into()]), Value::Bool(true));
    assert_eq!(fate(&ctx, "zypper"), Fate::Unmodified);
}

#[test]
fn test_taboo_blocks_install() {
    let ctx = TestContext::new();
    assert_eq!(ctx.call("PkgTaboo", &["foo".into()]), Value::Bool(true));
    assert_eq!(ctx.call("PkgInstall", &["foo".into()]), Value::Bool(false));

    let pool = ctx.bindings.pool();
    let foo = pool.get(ResKind::Package, "foo").expect("foo in pool");
    assert_eq!(foo.status(), SelStatus::Taboo);
    assert_ne!(foo.fate(), Fate::ToInstall);
}

#[test]
fn test_source_change_on_transitions_only() {
    let ctx = TestContext::new();
    for i in 1..=7 {
        let url = Url::parse(&format!("http://mirror.example.org/r{i}")).expect("valid url");
        ctx.bindings.add_repo(RepoInfo::new(&format!("r{i}"), url));
    }
    ctx.register("CallbackSourceChange", "Source::Change");

    let report = ctx.engine.reports().install();
    for (name, medium) in [("a", 2), ("b", 2), ("c", 3)] {
        let package = Resolvable::package(name, Edition::new("1", "1")).with_repo("r7", medium);
        report.start(&package);
    }

    assert_eq!(
        ctx.host.calls_to("Source::Change"),
        vec![
            vec![Value::Integer(7), Value::Integer(2)],
            vec![Value::Integer(7), Value::Integer(3)],
        ]
    );
}

#[test]
fn test_optional_file_probe_skips_media_prompt() {
    let ctx = TestContext::new();
    ctx.register("CallbackMediaChange", "Media::Change");
    ctx.bindings.context().set_probe_mode(ProbeMode::OptionalFile);

    let url = Url::parse("cd:///").expect("valid url");
    let action = ctx.engine.reports().media_change().request_media(&MediaRequest {
        url: &url,
        medium_nr: 1,
        label: "dvd",
        error: ReportError::NotFound,
        description: "File not found",
        devices: &[],
        current_device: 0,
    });

    assert_eq!(action, MediaAction::Abort);
    assert!(ctx.host.calls_to("Media::Change").is_empty());
}

#[test]
fn test_commit_abort_returns_minus_one() {
    let ctx = TestContext::new();
    ctx.call("PkgInstall", &["zypper".into()]);
    ctx.engine.script_commit(CommitScript::Abort);

    assert_eq!(
        ctx.call("PkgCommit", &[Value::Integer(0)]),
        Value::List(vec![Value::Integer(-1)])
    );
    assert_eq!(fate(&ctx, "zypper"), Fate::ToInstall);
}

#[test]
fn test_commit_installs_and_reports() {
    let ctx = TestContext::new();
    ctx.register("CallbackStartPackage", "Pkg::Start");
    ctx.call("PkgInstall", &["zypper".into()]);

    let result = ctx.call("PkgCommit", &[Value::Integer(0)]);
    let list = result.as_list().expect("commit result list");
    assert_eq!(list[0], Value::Integer(1));
    assert_eq!(ctx.host.calls_to("Pkg::Start").len(), 1);
    assert_eq!(ctx.engine.released(), 1);
    assert_eq!(ctx.call("PkgInstalled", &["zypper".into()]), Value::Bool(true));
}

#[test]
fn test_commit_retry_from_host() {
    let ctx = TestContext::new();
    ctx.register("CallbackDonePackage", "Pkg::Done");
    ctx.host.reply("Pkg::Done", "R".into());
    ctx.engine.fail_install_once("zypper");
    ctx.call("PkgInstall", &["zypper".into()]);

    let result = ctx.call("PkgCommit", &[Value::Integer(0)]);
    assert_eq!(result.as_list().expect("commit result list")[0], Value::Integer(1));

    // One problem at the forcing level, then the successful finish.
    let done = ctx.host.calls_to("Pkg::Done");
    assert_eq!(done.len(), 2);
    assert_eq!(done[0][0], Value::Integer(ReportError::Io.code()));
    assert_eq!(done[1][0], Value::Integer(0));
}

#[test]
fn test_upgrade_statistics_add_up() {
    let ctx = TestContext::new();
    let stats = ctx.call("PkgUpdateAll", &[Value::Map(BTreeMap::new())]);

    assert_eq!(int(&stats, "Iupdate"), 1);
    assert_eq!(int(&stats, "SumDropped"), 1);
    assert_eq!(
        int(&stats, "SumToInstall") + int(&stats, "SumToDelete") + int(&stats, "SumToKeep"),
        int(&stats, "SumProcessed")
    );
    assert_eq!(fate(&ctx, "vim"), Fate::ToInstall);
}

#[test]
fn test_save_restore_roundtrip() {
    let ctx = TestContext::new();
    assert_eq!(ctx.call("SaveState", &[]), Value::Bool(true));
    ctx.call("PkgInstall", &["zypper".into()]);
    ctx.call("PkgDelete", &["nano".into()]);
    assert_eq!(ctx.call("RestoreState", &[Value::Bool(true)]), Value::Bool(true));

    assert_eq!(ctx.call("RestoreState", &[]), Value::Bool(true));
    assert_eq!(fate(&ctx, "zypper"), Fate::Unmodified);
    assert_eq!(fate(&ctx, "nano"), Fate::Unmodified);
    assert_eq!(ctx.call("RestoreState", &[Value::Bool(true)]), Value::Bool(false));

    ctx.call("ClearSaveState", &[]);
    assert_eq!(ctx.call("RestoreState", &[]), Value::Bool(false));
}

#[test]
fn test_solve_failure_writes_problem_list() {
    let ctx = TestContext::new();
    ctx.engine
        .fail_resolve(&["nothing provides libfoo", "foo conflicts with bar"]);

    assert_eq!(ctx.call("PkgSolve", &[]), Value::Bool(false));
    assert_eq!(ctx.call("LastError", &[]), Value::from("2 packages failed"));
    assert_eq!(ctx.call("PkgSolveErrors", &[]), Value::Integer(2));

    let path = ctx.temp_dir.path().join("log").join("badlist");
    let content = std::fs::read_to_string(&path).expect("problem list written");
    assert!(content.starts_with("2 packages failed\n"));
    assert!(content.contains("foo conflicts with bar"));
}

#[test]
fn test_unknown_operation_is_an_error() {
    let ctx = TestContext::new();
    assert!(ctx.bindings.call("PkgFly", &[]).is_err());
}

/// Queries the bindings from inside its progress callback.
#[derive(Default)]
struct ReentrantHost {
    bindings: RefCell<Weak<PkgBindings>>,
    seen: RefCell<Vec<Value>>,
}

impl Host for ReentrantHost {
    fn call(&self, function: &str, _args: &[Value]) -> Result<Value, HostError> {
        if function != "Pkg::Progress" {
            return Ok(Value::Void);
        }
        let bindings = self.bindings.borrow().upgrade().ok_or_else(|| HostError::Failed {
            name: function.to_string(),
            message: "bindings dropped".to_string(),
        })?;
        let installed = bindings
            .call("PkgInstalled", &["vim".into()])
            .map_err(|e| HostError::Failed {
                name: function.to_string(),
                message: e.to_string(),
            })?;
        self.seen.borrow_mut().push(installed);
        Ok(Value::Bool(true))
    }
}

#[test]
fn test_host_reenters_during_commit() {
    let temp_dir = tempfile::TempDir::new().expect("failed to create temp dir");
    let host = Rc::new(ReentrantHost::default());
    let engine = Rc::new(MemoryEngine::new());
    let config = BridgeConfig {
        target_root: temp_dir.path().to_path_buf(),
        log_dir: temp_dir.path().join("log"),
        ..BridgeConfig::default()
    };
    let bindings = Rc::new(PkgBindings::new(host.clone(), engine, config));
    *host.bindings.borrow_mut() = Rc::downgrade(&bindings);
    bindings
        .pool_mut()
        .add(Resolvable::package("vim", Edition::new("9.0", "1")).installed());
    bindings
        .pool_mut()
        .add(Resolvable::package("zypper", Edition::new("1.14", "2")).with_repo("oss", 1));

    bindings
        .call("CallbackProgressPackage", &["Pkg::Progress".into()])
        .expect("register");
    bindings
        .call("PkgInstall", &["zypper".into()])
        .expect("install");
    let result = bindings
        .call("PkgCommit", &[Value::Integer(0)])
        .expect("commit");

    assert_eq!(result.as_list().expect("commit result list")[0], Value::Integer(1));
    // 0 is throttled away, 50 and 100 reach the host.
    assert_eq!(*host.seen.borrow(), vec![Value::Bool(true), Value::Bool(true)]);
}

/// Starts a download while resolving, so receivers run mid-solve.
struct DownloadingEngine {
    inner: MemoryEngine,
}

impl Engine for DownloadingEngine {
    fn reports(&self) -> Rc<ReportHub> {
        self.inner.reports()
    }

    fn resolve(&self, pool: &mut Pool) -> Result<bool, EngineError> {
        let url = Url::parse("http://download.example.org/oss/repodata/primary.xml.gz")
            .map_err(|e| EngineError::Failed(e.to_string()))?;
        self.reports()
            .download_progress()
            .start(&url, Path::new("/tmp/primary.xml.gz"));
        self.inner.resolve(pool)
    }

    fn problems(&self) -> Vec<String> {
        self.inner.problems()
    }

    fn solver_flags(&self) -> SolverFlags {
        self.inner.solver_flags()
    }

    fn set_solver_flags(&self, flags: SolverFlags) {
        self.inner.set_solver_flags(flags);
    }

    fn reset_solver(&self) {
        self.inner.reset_solver();
    }

    fn upgrade(
        &self,
        pool: &mut Pool,
        stats: &mut UpgradeStatistics,
    ) -> Result<bool, EngineError> {
        self.inner.upgrade(pool, stats)
    }

    fn verify_system(&self, pool: &mut Pool) -> Result<bool, EngineError> {
        self.inner.verify_system(pool)
    }

    fn load_target(&self, pool: &mut Pool) -> Result<(), EngineError> {
        self.inner.load_target(pool)
    }

    fn create_testcase(&self, pool: &Pool, dir: &Path) -> bool {
        self.inner.create_testcase(pool, dir)
    }

    fn commit(&self, request: &CommitRequest) -> Result<CommitResult, EngineError> {
        self.inner.commit(request)
    }

    fn release_media(&self) {
        self.inner.release_media();
    }

    fn provide_file(
        &self,
        repo: &RepoInfo,
        medium_nr: u32,
        path: &Path,
    ) -> Result<PathBuf, EngineError> {
        self.inner.provide_file(repo, medium_nr, path)
    }

    fn backup_path(&self) -> PathBuf {
        self.inner.backup_path()
    }

    fn set_backup_path(&self, path: &Path) {
        self.inner.set_backup_path(path);
    }

    fn create_backups(&self, enabled: bool) {
        self.inner.create_backups(enabled);
    }

    fn check_signature(&self, path: &Path) -> bool {
        self.inner.check_signature(path)
    }
}

/// Locks `foo` from the download start callback.
#[derive(Default)]
struct TabooHost {
    bindings: RefCell<Weak<PkgBindings>>,
    replies: RefCell<Vec<Value>>,
}

impl Host for TabooHost {
    fn call(&self, function: &str, _args: &[Value]) -> Result<Value, HostError> {
        if function != "Download::Start" {
            return Ok(Value::Void);
        }
        let failed = |message: String| HostError::Failed {
            name: function.to_string(),
            message,
        };
        let bindings = self
            .bindings
            .borrow()
            .upgrade()
            .ok_or_else(|| failed("bindings dropped".to_string()))?;
        let reply = bindings
            .call("PkgTaboo", &["foo".into()])
            .map_err(|e| failed(e.to_string()))?;
        self.replies.borrow_mut().push(reply);
        Ok(Value::Void)
    }
}

#[test]
fn test_host_changes_pool_during_solve() {
    let temp_dir = tempfile::TempDir::new().expect("failed to create temp dir");
    let host = Rc::new(TabooHost::default());
    let engine = Rc::new(DownloadingEngine {
        inner: MemoryEngine::new(),
    });
    let config = BridgeConfig {
        target_root: temp_dir.path().to_path_buf(),
        log_dir: temp_dir.path().join("log"),
        ..BridgeConfig::default()
    };
    let bindings = Rc::new(PkgBindings::new(host.clone(), engine, config));
    *host.bindings.borrow_mut() = Rc::downgrade(&bindings);
    bindings
        .pool_mut()
        .add(Resolvable::package("foo", Edition::new("1.0", "1")).with_repo("oss", 1));
    bindings
        .pool_mut()
        .add(Resolvable::package("zypper", Edition::new("1.14", "2")).with_repo("oss", 1));

    bindings
        .call("CallbackStartDownload", &["Download::Start".into()])
        .expect("register");
    bindings
        .call("PkgInstall", &["zypper".into()])
        .expect("install");
    let solved = bindings.call("PkgSolve", &[]).expect("solve");

    assert_eq!(solved, Value::Bool(true));
    assert_eq!(*host.replies.borrow(), vec![Value::Bool(true)]);
    let pool = bindings.pool();
    let foo = pool.get(ResKind::Package, "foo").expect("foo in pool");
    assert_eq!(foo.status(), SelStatus::Taboo);
    let zypper = pool.get(ResKind::Package, "zypper").expect("zypper in pool");
    assert_eq!(zypper.fate(), Fate::ToInstall);
}
