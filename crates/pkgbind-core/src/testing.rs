//! In-memory host and engine.
//!
//! [`RecordingHost`] records every callback invocation and answers from a
//! reply table. [`MemoryEngine`] implements [`Engine`] over the pool alone:
//! it resolves, upgrades and commits without touching a system, emitting
//! the same report events a real engine would. Both are used by the tests
//! and are handy for trying host scripts without an engine.
//!
//! Only built for this crate's tests and with the `testing` feature.

use crate::engine::{Engine, SolverFlags};
use crate::error::{EngineError, HostError};
use crate::host::Host;
use crate::pool::{Fate, Pool, TransactBy};
use crate::repos::RepoInfo;
use crate::report::{InstallReport, MediaChangeReport, MediaRequest, RemoveReport, ReportHub};
use pkgbind_schema::{
    CommitAction, CommitRequest, CommitResult, InstallLevel, ProblemAction, ReportError, ResKind,
    Resolvable, UpgradeStatistics, Value,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Host that records calls and replies from a table. Unknown functions
/// reply void.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: RefCell<Vec<(String, Vec<Value>)>>,
    replies: RefCell<HashMap<String, Value>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later call of `function` with `value`.
    pub fn reply(&self, function: &str, value: Value) {
        self.replies.borrow_mut().insert(function.to_string(), value);
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.borrow().clone()
    }

    /// Arguments of every call of `function`, oldest first.
    pub fn calls_to(&self, function: &str) -> Vec<Vec<Value>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| name == function)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

impl Host for RecordingHost {
    fn call(&self, function: &str, args: &[Value]) -> Result<Value, HostError> {
        self.calls
            .borrow_mut()
            .push((function.to_string(), args.to_vec()));
        Ok(self
            .replies
            .borrow()
            .get(function)
            .cloned()
            .unwrap_or_default())
    }
}

/// How [`MemoryEngine::commit`] behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitScript {
    /// Run every step, emitting install and remove events.
    #[default]
    Succeed,
    /// Fail with [`EngineError::Aborted`] before doing anything.
    Abort,
    /// Fail with [`EngineError::Failed`].
    Fail(String),
}

#[derive(Debug, Clone, Default)]
enum ResolveScript {
    #[default]
    Succeed,
    Problems(Vec<String>),
    Error(String),
}

pub struct MemoryEngine {
    hub: Rc<ReportHub>,
    resolve: RefCell<ResolveScript>,
    problems: RefCell<Vec<String>>,
    auto_install: RefCell<Vec<String>>,
    flags: Cell<SolverFlags>,
    resets: Cell<usize>,
    target_error: RefCell<Option<String>>,
    commit: RefCell<CommitScript>,
    fail_once: RefCell<HashSet<String>>,
    requests: RefCell<Vec<CommitRequest>>,
    released: Cell<usize>,
    backup_path: RefCell<PathBuf>,
    backups: Cell<bool>,
    signature_ok: Cell<bool>,
    files: RefCell<HashMap<(String, u32, PathBuf), PathBuf>>,
    testcases: RefCell<Vec<PathBuf>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            hub: ReportHub::new(),
            resolve: RefCell::default(),
            problems: RefCell::default(),
            auto_install: RefCell::default(),
            flags: Cell::default(),
            resets: Cell::new(0),
            target_error: RefCell::default(),
            commit: RefCell::default(),
            fail_once: RefCell::default(),
            requests: RefCell::default(),
            released: Cell::new(0),
            backup_path: RefCell::new(PathBuf::from("/var/adm/backup")),
            backups: Cell::new(false),
            signature_ok: Cell::new(true),
            files: RefCell::default(),
            testcases: RefCell::default(),
        }
    }

    /// Make the next resolutions fail with `problems`.
    pub fn fail_resolve(&self, problems: &[&str]) {
        let problems = problems.iter().map(ToString::to_string).collect();
        *self.resolve.borrow_mut() = ResolveScript::Problems(problems);
    }

    /// Make the next resolutions error out.
    pub fn error_resolve(&self, message: &str) {
        *self.resolve.borrow_mut() = ResolveScript::Error(message.to_string());
    }

    /// Have a successful resolution select package `name` at solver level.
    pub fn auto_install(&self, name: &str) {
        self.auto_install.borrow_mut().push(name.to_string());
    }

    pub fn fail_target_load(&self, message: &str) {
        *self.target_error.borrow_mut() = Some(message.to_string());
    }

    pub fn script_commit(&self, script: CommitScript) {
        *self.commit.borrow_mut() = script;
    }

    /// Make the first install attempt of package `name` fail.
    pub fn fail_install_once(&self, name: &str) {
        self.fail_once.borrow_mut().insert(name.to_string());
    }

    /// Make `path` on medium `medium_nr` of repository `alias` available,
    /// stored locally at `local`.
    pub fn add_file(&self, alias: &str, medium_nr: u32, path: &str, local: &str) {
        self.files.borrow_mut().insert(
            (alias.to_string(), medium_nr, PathBuf::from(path)),
            PathBuf::from(local),
        );
    }

    pub fn set_signature_ok(&self, ok: bool) {
        self.signature_ok.set(ok);
    }

    /// Commit requests received so far.
    pub fn requests(&self) -> Vec<CommitRequest> {
        self.requests.borrow().clone()
    }

    /// How often the media were released.
    pub fn released(&self) -> usize {
        self.released.get()
    }

    /// How often the solver was reset.
    pub fn resets(&self) -> usize {
        self.resets.get()
    }

    pub fn backups_enabled(&self) -> bool {
        self.backups.get()
    }

    pub fn testcases(&self) -> Vec<PathBuf> {
        self.testcases.borrow().clone()
    }

    /// Install one package through the install report. `Ok(false)` means
    /// the user chose to skip it.
    fn install(&self, resolvable: &Resolvable) -> Result<bool, EngineError> {
        let report = self.hub.install();
        report.start(resolvable);
        if self.fail_once.borrow_mut().remove(&resolvable.name) {
            let levels = [
                InstallLevel::Normal,
                InstallLevel::NoDeps,
                InstallLevel::NoDepsForce,
            ];
            for level in levels {
                match report.problem(resolvable, ReportError::Io, "rpm failed", level) {
                    ProblemAction::Retry => return self.install(resolvable),
                    ProblemAction::Ignore => {
                        report.finish(resolvable, ReportError::Io, "rpm failed", level);
                        return Ok(false);
                    }
                    ProblemAction::Abort if level == InstallLevel::NoDepsForce => {
                        return Err(EngineError::Aborted);
                    }
                    ProblemAction::Abort => {}
                }
            }
        }
        for value in [0, 50, 100] {
            if !report.progress(value, resolvable) {
                return Err(EngineError::Aborted);
            }
        }
        report.finish(resolvable, ReportError::NoError, "", InstallLevel::Normal);
        Ok(true)
    }

    fn remove(&self, resolvable: &Resolvable) -> Result<bool, EngineError> {
        let report = self.hub.remove();
        report.start(resolvable);
        for value in [0, 50, 100] {
            if !report.progress(value, resolvable) {
                return Err(EngineError::Aborted);
            }
        }
        report.finish(resolvable, ReportError::NoError, "");
        Ok(true)
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("hub", &self.hub)
            .field("flags", &self.flags.get())
            .field("requests", &self.requests.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Engine for MemoryEngine {
    fn reports(&self) -> Rc<ReportHub> {
        Rc::clone(&self.hub)
    }

    fn resolve(&self, pool: &mut Pool) -> Result<bool, EngineError> {
        pool.reset_solver_transacts();
        let script = self.resolve.borrow().clone();
        match script {
            ResolveScript::Succeed => {
                self.problems.borrow_mut().clear();
                for name in self.auto_install.borrow().iter() {
                    if let Some(sel) = pool.get_mut(ResKind::Package, name) {
                        sel.set_to_install(TransactBy::Solver);
                    }
                }
                Ok(true)
            }
            ResolveScript::Problems(problems) => {
                *self.problems.borrow_mut() = problems;
                Ok(false)
            }
            ResolveScript::Error(message) => {
                self.problems.borrow_mut().clear();
                Err(EngineError::Failed(message))
            }
        }
    }

    fn problems(&self) -> Vec<String> {
        self.problems.borrow().clone()
    }

    fn solver_flags(&self) -> SolverFlags {
        self.flags.get()
    }

    fn set_solver_flags(&self, flags: SolverFlags) {
        self.flags.set(flags);
    }

    fn reset_solver(&self) {
        self.resets.set(self.resets.get() + 1);
        self.problems.borrow_mut().clear();
    }

    fn upgrade(
        &self,
        pool: &mut Pool,
        stats: &mut UpgradeStatistics,
    ) -> Result<bool, EngineError> {
        for sel in pool.by_kind_mut(ResKind::Package) {
            let Some(installed) = sel.installed_obj().map(|p| p.resolvable.edition.clone())
            else {
                continue;
            };
            stats.chk_installed_total += 1;
            match sel.fate() {
                Fate::ToInstall => {
                    stats.chk_already_toins += 1;
                    continue;
                }
                Fate::ToDelete => {
                    stats.chk_already_todel += 1;
                    continue;
                }
                Fate::Unmodified => {}
            }
            if sel.is_locked() {
                stats.chk_is_taboo += 1;
                continue;
            }
            let Some(candidate) = sel.candidate().map(|p| p.resolvable.edition.clone()) else {
                stats.chk_dropped += 1;
                continue;
            };
            if candidate > installed {
                sel.set_to_install(TransactBy::Solver);
                stats.chk_to_update += 1;
            } else if candidate < installed && stats.silent_downgrades {
                sel.set_to_install(TransactBy::Solver);
                stats.chk_to_downgrade += 1;
            } else if candidate < installed {
                stats.chk_to_keep_downgrade += 1;
            } else {
                stats.chk_to_keep_installed += 1;
            }
        }
        Ok(true)
    }

    fn verify_system(&self, pool: &mut Pool) -> Result<bool, EngineError> {
        let consistent = !matches!(&*self.resolve.borrow(), ResolveScript::Problems(_));
        pool.reset_all(TransactBy::User);
        Ok(consistent)
    }

    fn load_target(&self, _pool: &mut Pool) -> Result<(), EngineError> {
        match &*self.target_error.borrow() {
            Some(message) => Err(EngineError::Failed(message.clone())),
            None => Ok(()),
        }
    }

    fn create_testcase(&self, _pool: &Pool, dir: &Path) -> bool {
        self.testcases.borrow_mut().push(dir.to_path_buf());
        true
    }

    fn commit(&self, request: &CommitRequest) -> Result<CommitResult, EngineError> {
        self.requests.borrow_mut().push(request.clone());
        let script = self.commit.borrow().clone();
        match script {
            CommitScript::Succeed => {}
            CommitScript::Abort => return Err(EngineError::Aborted),
            CommitScript::Fail(message) => return Err(EngineError::Failed(message)),
        }

        let mut result = CommitResult::default();
        for step in &request.steps {
            let r = &step.resolvable;
            let done = match step.action {
                CommitAction::Delete => self.remove(r)?,
                CommitAction::Install => {
                    let medium = r.medium_nr.max(1);
                    if request.restrict_to_medium != 0 && medium != request.restrict_to_medium {
                        if r.kind() == ResKind::SrcPackage {
                            result.src_remaining.push(step.id);
                        } else {
                            result.remaining.push(step.id);
                        }
                        continue;
                    }
                    self.install(r)?
                }
            };
            if done {
                result.result += 1;
            } else {
                result.errors.push(step.id);
            }
        }
        Ok(result)
    }

    fn release_media(&self) {
        self.released.set(self.released.get() + 1);
    }

    fn provide_file(
        &self,
        repo: &RepoInfo,
        medium_nr: u32,
        path: &Path,
    ) -> Result<PathBuf, EngineError> {
        let key = (repo.alias.clone(), medium_nr, path.to_path_buf());
        let found = self.files.borrow().get(&key).cloned();
        if let Some(local) = found {
            return Ok(local);
        }

        let Some(url) = repo.urls.first() else {
            return Err(EngineError::Failed(format!("{} has no URL", repo.alias)));
        };
        let description = format!("File {} not found on medium {medium_nr}", path.display());
        let action = self.hub.media_change().request_media(&MediaRequest {
            url,
            medium_nr,
            label: &repo.alias,
            error: ReportError::NotFound,
            description: &description,
            devices: &[],
            current_device: 0,
        });
        tracing::debug!(?action, "Media change answered");
        Err(EngineError::Failed(description))
    }

    fn backup_path(&self) -> PathBuf {
        self.backup_path.borrow().clone()
    }

    fn set_backup_path(&self, path: &Path) {
        *self.backup_path.borrow_mut() = path.to_path_buf();
    }

    fn create_backups(&self, enabled: bool) {
        self.backups.set(enabled);
    }

    fn check_signature(&self, _path: &Path) -> bool {
        self.signature_ok.get()
    }
}
