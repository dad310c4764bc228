//! Solver, upgrade, saved state and commit.

use super::PkgBindings;
use crate::base_product;
use crate::engine::SolverFlags;
use crate::error::{BridgeError, EngineError};
use anyhow::{Context, Result};
use pkgbind_schema::{ItemId, Key, ResKind, Resolvable, UpgradeStatistics, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Upgrade statistics as the symbol-keyed map `PkgUpdateAll` returns.
pub fn statistics_map(stats: &UpgradeStatistics) -> Value {
    let entries = [
        ("ProblemListSze", stats.chk_is_taboo + stats.chk_dropped),
        ("SumToInstall", stats.total_to_install()),
        ("Ipreselected", stats.chk_already_toins),
        ("Iupdate", stats.chk_to_update),
        ("Idowngrade", stats.chk_to_downgrade),
        (
            "Ireplaced",
            stats.chk_replaced + stats.chk_replaced_guessed + stats.chk_add_split,
        ),
        ("SumToDelete", stats.total_to_delete()),
        ("Dpreselected", stats.chk_already_todel),
        ("SumToKeep", stats.total_to_keep()),
        ("Ktaboo", stats.chk_is_taboo),
        ("Knewer", stats.chk_to_keep_downgrade),
        ("Ksame", stats.chk_to_keep_installed),
        ("SumDropped", stats.chk_dropped),
        ("SumProcessed", stats.chk_installed_total),
    ];
    Value::map(
        entries
            .into_iter()
            .map(|(key, n)| (Key::symbol(key), Value::from(n))),
    )
}

/// Write the solver problems, one per line after a count line.
fn save_problem_list(path: &Path, problems: &[String]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let mut out = format!("{} packages failed\n", problems.len());
    for problem in problems {
        out.push_str(problem);
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

fn remaining_entry(r: &Resolvable) -> Value {
    let kind = match r.kind() {
        ResKind::Product | ResKind::Pattern | ResKind::Patch => r.kind().as_str(),
        ResKind::Package | ResKind::SrcPackage => "package",
    };
    Value::map([
        ("name", Value::from(r.name.as_str())),
        ("kind", Value::symbol(kind)),
        ("arch", Value::from(r.arch.as_str())),
        ("version", Value::from(r.edition.to_string())),
    ])
}

impl PkgBindings {
    /// Resolve the pending changes. On failure the problems go to the
    /// problem-list file.
    pub(super) fn solve(&self) -> bool {
        let details = format!(
            "See {} for more information.",
            self.config.problem_list_path().display()
        );
        let resolved = match self.on_pool_copy(|pool| self.engine.resolve(pool)) {
            Ok(true) => return true,
            Ok(false) => false,
            Err(e) => {
                tracing::error!("An error occurred during PkgSolve: {e}");
                self.set_last_error(e.to_string(), details.clone());
                false
            }
        };

        let problems = self.engine.problems();
        if !problems.is_empty() {
            let path = self.config.problem_list_path();
            tracing::error!(
                "PkgSolve: {} packages failed (see {})",
                problems.len(),
                path.display()
            );
            if let Err(e) = save_problem_list(&path, &problems) {
                tracing::error!("{e:#}");
            }
            self.set_last_error(format!("{} packages failed", problems.len()), details);
        }
        resolved
    }

    /// Reload the installed system and check its consistency. Pending
    /// changes are reset.
    pub(super) fn solve_check_target_only(&self) -> bool {
        if let Err(e) = self.on_pool_copy(|pool| self.engine.load_target(pool)) {
            tracing::error!("Cannot load the target: {e}");
            return false;
        }
        match self.on_pool_copy(|pool| self.engine.verify_system(pool)) {
            Ok(consistent) => consistent,
            Err(e) => {
                tracing::error!("An error occurred during PkgSolveCheckTargetOnly: {e}");
                self.set_last_error(e.to_string(), "");
                false
            }
        }
    }

    pub(super) fn solve_errors(&self) -> Value {
        self.engine.problems().len().into()
    }

    pub(super) fn update_all(&self, options: &Value) -> Value {
        let mut stats = UpgradeStatistics::default();
        if options.get("delete_unmaintained").is_some() {
            tracing::warn!("'delete_unmaintained' flag is obsolete and has no effect");
        }
        match options.get("silent_downgrades") {
            Some(Value::Bool(silent)) => stats.silent_downgrades = *silent,
            Some(other) => {
                tracing::error!("Unexpected 'silent_downgrades' value {other}, must be a boolean")
            }
            None => {}
        }
        if options.get("keep_installed_patches").is_some() {
            tracing::warn!("'keep_installed_patches' flag is obsolete and has no effect");
        }

        if let Err(e) = self.on_pool_copy(|pool| self.engine.upgrade(pool, &mut stats)) {
            tracing::error!("Upgrade failed: {e}");
            return Value::Map(BTreeMap::new());
        }
        tracing::info!(
            to_install = stats.total_to_install(),
            to_delete = stats.total_to_delete(),
            to_keep = stats.total_to_keep(),
            "Upgrade planned"
        );
        statistics_map(&stats)
    }

    pub(super) fn set_solver_flags(&self, params: &Value) -> bool {
        let flag = |key| params.get(key).and_then(Value::as_bool);
        if flag("reset") == Some(true) {
            tracing::info!("Resetting the solver");
            self.engine.reset_solver();
        }
        let mut flags = self.engine.solver_flags();
        if let Some(ignore) = flag("ignoreAlreadyRecommended") {
            tracing::info!(ignore, "Setting solver flag ignoreAlreadyRecommended");
            flags.ignore_already_recommended = ignore;
        }
        if let Some(only) = flag("onlyRequires") {
            tracing::info!(only, "Setting solver flag onlyRequires");
            flags.only_requires = only;
        }
        self.engine.set_solver_flags(flags);
        true
    }

    pub(super) fn get_solver_flags(&self) -> Value {
        let SolverFlags {
            ignore_already_recommended,
            only_requires,
        } = self.engine.solver_flags();
        Value::map([
            ("onlyRequires", Value::from(only_requires)),
            ("ignoreAlreadyRecommended", Value::from(ignore_already_recommended)),
        ])
    }

    pub(super) fn create_solver_testcase(&self, dir: &str) -> bool {
        if dir.is_empty() {
            tracing::error!("CreateSolverTestCase: empty directory");
            return false;
        }
        tracing::info!("Creating a solver test case in directory {dir}");
        let pool = self.pool.borrow().clone();
        let saved = self.engine.create_testcase(&pool, Path::new(dir));
        tracing::info!(saved, "Testcase");
        saved
    }

    pub(super) fn save_state(&self) -> bool {
        let mut pool = self.pool.borrow_mut();
        if pool.has_saved_state() {
            tracing::warn!("SaveState has been already called, rewriting the saved state");
        }
        tracing::info!("Saving status");
        pool.save_state();
        true
    }

    /// Put the saved state back, or with `check_only` just report whether
    /// the current state differs from it.
    pub(super) fn restore_state(&self, check_only: bool) -> bool {
        let mut pool = self.pool.borrow_mut();
        if check_only {
            return pool.differs_from_saved();
        }
        if !pool.restore_state() {
            tracing::error!("No previous state saved, state cannot be restored");
            return false;
        }
        tracing::info!("Restored the saved status");
        true
    }

    pub(super) fn clear_save_state(&self) -> bool {
        self.pool.borrow_mut().clear_state();
        true
    }

    /// Install and remove the pending items, restricted to medium
    /// `medium` unless it is 0.
    ///
    /// Returns `[result, failed names, remaining items, remaining source
    /// package names]`, `[-1]` when the user aborted, or void when the
    /// engine failed.
    pub(super) fn commit(&self, medium: i64) -> Result<Value, BridgeError> {
        let medium_nr = u32::try_from(medium).map_err(|_| BridgeError::BadArgument {
            op: "PkgCommit".to_string(),
            index: 0,
            expected: "a non-negative medium number",
            got: medium.to_string(),
        })?;

        self.ctx.reset_last_reported();
        let request = self.pool.borrow().commit_request(medium_nr);
        tracing::info!(medium = medium_nr, steps = request.steps.len(), "Committing");

        let result = match self.engine.commit(&request) {
            Ok(result) => result,
            Err(EngineError::Aborted) => {
                tracing::info!("Installation aborted by user");
                return Ok(Value::List(vec![Value::Integer(-1)]));
            }
            Err(e) => {
                tracing::error!("PkgCommit has failed: {e}");
                self.set_last_error(e.to_string(), "");
                return Ok(Value::Void);
            }
        };

        self.engine.release_media();
        self.pool.borrow_mut().apply_commit(&request, &result);
        base_product::update_link(&self.config.target_root, &self.pool.borrow());

        let resolvable = |id: ItemId| {
            request
                .steps
                .iter()
                .find(|s| s.id == id)
                .map(|s| &s.resolvable)
        };
        let names = |ids: &[ItemId]| -> Value {
            ids.iter()
                .filter_map(|&id| resolvable(id))
                .map(|r| r.name.as_str())
                .collect()
        };
        let remaining: Value = result
            .remaining
            .iter()
            .filter_map(|&id| resolvable(id))
            .map(remaining_entry)
            .collect();

        Ok(Value::List(vec![
            Value::Integer(result.result),
            names(&result.errors),
            remaining,
            names(&result.src_remaining),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::repos::RepoInfo;
    use crate::testing::{CommitScript, MemoryEngine, RecordingHost};
    use pkgbind_schema::Edition;
    use std::rc::Rc;
    use tempfile::TempDir;
    use url::Url;

    fn bindings(log_dir: &Path) -> (Rc<MemoryEngine>, PkgBindings) {
        let engine = Rc::new(MemoryEngine::new());
        let config = BridgeConfig {
            log_dir: log_dir.to_path_buf(),
            target_root: log_dir.join("root"),
            ..Default::default()
        };
        let b = PkgBindings::new(Rc::new(RecordingHost::new()), engine.clone(), config);
        b.add_repo(RepoInfo::new("oss", Url::parse("http://example.com/oss").unwrap()));
        {
            let mut pool = b.pool_mut();
            pool.add(Resolvable::package("vim", Edition::new("9.0", "1")).installed());
            pool.add(Resolvable::package("vim", Edition::new("9.1", "1")).with_repo("oss", 1));
            pool.add(Resolvable::package("zypper", Edition::new("1.14", "1")).with_repo("oss", 2));
            pool.add(Resolvable::package("nano", Edition::new("7", "1")).installed());
        }
        (engine, b)
    }

    #[test]
    fn test_statistics_map_keys() {
        let stats = UpgradeStatistics {
            chk_to_update: 3,
            chk_replaced: 1,
            chk_add_split: 1,
            chk_is_taboo: 2,
            chk_dropped: 1,
            chk_installed_total: 10,
            ..Default::default()
        };
        let map = statistics_map(&stats);
        let get = |k: &str| map.as_map().unwrap().get(&Key::symbol(k)).cloned();
        assert_eq!(get("ProblemListSze"), Some(Value::Integer(3)));
        assert_eq!(get("SumToInstall"), Some(Value::Integer(5)));
        assert_eq!(get("Ireplaced"), Some(Value::Integer(2)));
        assert_eq!(get("SumToKeep"), Some(Value::Integer(3)));
        assert_eq!(get("SumProcessed"), Some(Value::Integer(10)));
        assert_eq!(map.as_map().unwrap().len(), 14);
    }

    #[test]
    fn test_solve_failure_writes_problem_list() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(&dir.path().join("log"));
        engine.fail_resolve(&["nothing provides libfoo", "conflict with bar"]);
        assert_eq!(b.call("PkgSolve", &[]).unwrap(), Value::Bool(false));
        let text = std::fs::read_to_string(b.config().problem_list_path()).unwrap();
        assert_eq!(text, "2 packages failed\nnothing provides libfoo\nconflict with bar\n");
        assert_eq!(b.call("PkgSolveErrors", &[]).unwrap(), Value::Integer(2));
        assert!(b.last_error().details().contains("badlist"));
    }

    #[test]
    fn test_solve_exception_sets_last_error() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        engine.error_resolve("solver crashed");
        assert_eq!(b.call("PkgSolve", &[]).unwrap(), Value::Bool(false));
        assert_eq!(b.call("LastError", &[]).unwrap(), Value::from("solver crashed"));
    }

    #[test]
    fn test_solve_success_keeps_solver_selections() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        engine.auto_install("zypper");
        assert_eq!(b.call("PkgSolve", &[]).unwrap(), Value::Bool(true));
        let by_solver = [true, false, false, true].map(Value::Bool);
        assert_eq!(
            b.call("FilterPackages", &by_solver).unwrap(),
            Value::List(vec!["zypper".into()])
        );
    }

    #[test]
    fn test_solver_flags() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        let params = Value::map([
            ("reset", Value::Bool(true)),
            ("onlyRequires", Value::Bool(true)),
            ("ignoreAlreadyRecommended", Value::from("yes")),
        ]);
        assert_eq!(b.call("SetSolverFlags", &[params]).unwrap(), Value::Bool(true));
        assert_eq!(engine.resets(), 1);
        let flags = b.call("GetSolverFlags", &[]).unwrap();
        assert_eq!(flags.get("onlyRequires"), Some(&Value::Bool(true)));
        assert_eq!(flags.get("ignoreAlreadyRecommended"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_save_restore_state() {
        let dir = TempDir::new().unwrap();
        let (_engine, b) = bindings(dir.path());
        assert_eq!(b.call("RestoreState", &[]).unwrap(), Value::Bool(false));
        assert_eq!(b.call("SaveState", &[]).unwrap(), Value::Bool(true));
        b.call("PkgInstall", &["zypper".into()]).unwrap();
        assert_eq!(b.call("RestoreState", &[Value::Bool(true)]).unwrap(), Value::Bool(true));
        assert_eq!(b.call("RestoreState", &[]).unwrap(), Value::Bool(true));
        assert_eq!(b.call("RestoreState", &[Value::Bool(true)]).unwrap(), Value::Bool(false));
        assert_eq!(b.call("ClearSaveState", &[]).unwrap(), Value::Bool(true));
        assert_eq!(b.call("RestoreState", &[]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_update_all_returns_statistics() {
        let dir = TempDir::new().unwrap();
        let (_engine, b) = bindings(dir.path());
        let options = Value::map([("silent_downgrades", Value::Integer(1))]);
        let out = b.call("PkgUpdateAll", &[options]).unwrap();
        assert_eq!(out.get("Iupdate"), Some(&Value::Integer(1)));
        assert_eq!(out.get("SumDropped"), Some(&Value::Integer(1)));
        assert_eq!(out.get("SumProcessed"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_commit_restricted_to_medium() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        b.call("PkgInstall", &["vim".into()]).unwrap();
        b.call("PkgInstall", &["zypper".into()]).unwrap();
        let out = b.call("PkgCommit", &[Value::Integer(1)]).unwrap();
        let out = out.as_list().unwrap();
        assert_eq!(out[0], Value::Integer(1));
        assert_eq!(out[1], Value::empty_list());
        let remaining = out[2].as_list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].get("name"), Some(&Value::from("zypper")));
        assert_eq!(remaining[0].get("kind"), Some(&Value::symbol("package")));
        assert_eq!(engine.released(), 1);
        assert_eq!(engine.requests()[0].restrict_to_medium, 1);

        let pool = b.pool();
        let vim = pool.get(ResKind::Package, "vim").unwrap();
        assert_eq!(vim.installed()[0].resolvable.edition.version, "9.1");
        assert!(pool.get(ResKind::Package, "zypper").unwrap().candidate().unwrap().status.transacts());
    }

    #[test]
    fn test_commit_abort_and_failure() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        engine.script_commit(CommitScript::Abort);
        assert_eq!(
            b.call("PkgCommit", &[Value::Integer(0)]).unwrap(),
            Value::List(vec![Value::Integer(-1)])
        );
        engine.script_commit(CommitScript::Fail("rpm database locked".into()));
        assert!(b.call("PkgCommit", &[Value::Integer(0)]).unwrap().is_void());
        assert_eq!(b.last_error().message(), "rpm database locked");
        assert_eq!(engine.released(), 0);
        assert!(b.call("PkgCommit", &[Value::Integer(-1)]).is_err());
    }

    #[test]
    fn test_testcase_needs_directory() {
        let dir = TempDir::new().unwrap();
        let (engine, b) = bindings(dir.path());
        assert_eq!(b.call("CreateSolverTestCase", &["".into()]).unwrap(), Value::Bool(false));
        assert_eq!(
            b.call("CreateSolverTestCase", &["/tmp/tc".into()]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(engine.testcases(), vec![std::path::PathBuf::from("/tmp/tc")]);
    }
}
