//! The package engine contract.
//!
//! The bindings drive the engine only through [`Engine`]. Every method takes
//! `&self`: the engine runs on the host's thread and keeps its own state
//! behind interior mutability. While a call runs the engine may emit events
//! through [`Engine::reports`], and receivers may call back into the host.
//! The bindings never hold a borrow of their own state across such a call.

use crate::error::EngineError;
use crate::pool::Pool;
use crate::repos::RepoInfo;
use crate::report::ReportHub;
use pkgbind_schema::{CommitRequest, CommitResult, UpgradeStatistics};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Solver options the host can read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverFlags {
    /// Do not select recommended packages for already installed packages.
    pub ignore_already_recommended: bool,
    /// Only follow hard requirements.
    pub only_requires: bool,
}

pub trait Engine {
    /// Hub the engine emits its reports through.
    fn reports(&self) -> Rc<ReportHub>;

    /// Resolve dependencies of the pending changes in `pool`.
    ///
    /// Returns `Ok(false)` when the solver found problems; they are then
    /// available through [`Engine::problems`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the solver could not run at all.
    fn resolve(&self, pool: &mut Pool) -> Result<bool, EngineError>;

    /// Descriptions of the problems of the last failed resolution.
    fn problems(&self) -> Vec<String>;

    fn solver_flags(&self) -> SolverFlags;

    fn set_solver_flags(&self, flags: SolverFlags);

    /// Forget extra requirements, fix-system mode and data of previous runs.
    fn reset_solver(&self);

    /// Plan a distribution upgrade, filling `stats`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when planning failed.
    fn upgrade(&self, pool: &mut Pool, stats: &mut UpgradeStatistics)
    -> Result<bool, EngineError>;

    /// Check the dependencies of the installed system. Pending changes are
    /// reset afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the check could not run.
    fn verify_system(&self, pool: &mut Pool) -> Result<bool, EngineError>;

    /// (Re)load the installed system into `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the target database cannot be read.
    fn load_target(&self, pool: &mut Pool) -> Result<(), EngineError>;

    /// Write a solver test case for the current pool into `dir`.
    fn create_testcase(&self, pool: &Pool, dir: &Path) -> bool;

    /// Install and remove the planned items.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Aborted`] when the user aborted from a
    /// callback, another [`EngineError`] when the commit failed.
    fn commit(&self, request: &CommitRequest) -> Result<CommitResult, EngineError>;

    /// Release every attached medium.
    fn release_media(&self);

    /// Fetch `path` from medium `medium_nr` of `repo` and return where it
    /// was stored locally.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the file cannot be provided.
    fn provide_file(
        &self,
        repo: &RepoInfo,
        medium_nr: u32,
        path: &Path,
    ) -> Result<PathBuf, EngineError>;

    fn backup_path(&self) -> PathBuf;

    fn set_backup_path(&self, path: &Path);

    /// Enable or disable package backups before updates.
    fn create_backups(&self, enabled: bool);

    /// Verify the signature of an RPM file.
    fn check_signature(&self, path: &Path) -> bool;
}
