//! Named operations the host calls.
//!
//! [`PkgBindings`] owns everything the host talks to: the dispatch context
//! with the callback registry, the pool, the connected receivers and the
//! engine handle. The host reaches every operation through
//! [`PkgBindings::call`] with positional arguments.
//!
//! Operations never keep a pool borrow while the engine runs. Engine work
//! happens on a copy of the pool that replaces the pool afterwards, so a
//! host callback fired in between reads a consistent pool.

mod args;
mod media;
mod package;
mod resolvable;
mod solver;
mod target;

pub use args::Args;
pub use solver::statistics_map;

use crate::config::BridgeConfig;
use crate::context::DispatchContext;
use crate::engine::Engine;
use crate::error::{BridgeError, LastError};
use crate::host::Host;
use crate::pool::Pool;
use crate::receivers::Receivers;
use crate::repos::{RepoId, RepoInfo};
use pkgbind_schema::{EventId, OBSOLETE_REGISTRATIONS, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;

pub struct PkgBindings {
    ctx: Rc<DispatchContext>,
    engine: Rc<dyn Engine>,
    pool: RefCell<Pool>,
    config: BridgeConfig,
    last_error: RefCell<LastError>,
    /// Names already warned about as obsolete.
    warned: RefCell<HashSet<String>>,
    receivers: Receivers,
}

impl PkgBindings {
    /// Create the bindings and connect a receiver for every engine event
    /// class. The receivers stay connected until the bindings drop.
    pub fn new(host: Rc<dyn Host>, engine: Rc<dyn Engine>, config: BridgeConfig) -> Self {
        let ctx = Rc::new(DispatchContext::new(host, config.throttle));
        let receivers = Receivers::connect(&engine.reports(), &ctx);
        tracing::info!(
            target_root = %config.target_root.display(),
            receivers = receivers.len(),
            "Package bindings initialized"
        );
        Self {
            ctx,
            engine,
            pool: RefCell::new(Pool::new()),
            config,
            last_error: RefCell::new(LastError::default()),
            warned: RefCell::new(HashSet::new()),
            receivers,
        }
    }

    pub fn context(&self) -> &Rc<DispatchContext> {
        &self.ctx
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pool(&self) -> Ref<'_, Pool> {
        self.pool.borrow()
    }

    /// Mutable pool access, for loading instances.
    pub fn pool_mut(&self) -> RefMut<'_, Pool> {
        self.pool.borrow_mut()
    }

    /// Register a repository and return the id the host sees.
    pub fn add_repo(&self, info: RepoInfo) -> RepoId {
        self.ctx.repos_mut().add(info)
    }

    pub fn last_error(&self) -> Ref<'_, LastError> {
        self.last_error.borrow()
    }

    pub fn receivers(&self) -> &Receivers {
        &self.receivers
    }

    /// Invoke operation `op`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] for unknown operations and malformed
    /// arguments. Engine failures are not errors: the operation returns its
    /// failure value and records [`LastError`].
    pub fn call(&self, op: &str, values: &[Value]) -> Result<Value, BridgeError> {
        tracing::debug!(op, args = values.len(), "Host call");
        let args = Args::new(op, values);

        if let Some(event) = EventId::from_builtin(op) {
            let name = args.str(0)?;
            self.ctx.set_callback(event, name);
            return Ok(Value::Void);
        }
        if OBSOLETE_REGISTRATIONS.contains(&op) {
            self.warn_once(op, "callback registration is obsolete and has no effect");
            return Ok(Value::Void);
        }

        match op {
            // Presence
            "PkgInstalled" => self.pkg_installed(args.str(0)?),
            "PkgAvailable" => self.pkg_available(args.str(0)?),
            "IsProvided" => Ok(self.is_provided(args.str(0)?).into()),
            "IsSelected" => Ok(self.is_selected(args.str(0)?).into()),
            "IsAvailable" => Ok(self.is_available(args.str(0)?).into()),
            "PkgQueryProvides" => Ok(self.query_provides(args.str(0)?)),

            // Information
            "PkgSummary" => Ok(self.pkg_summary(args.str(0)?)),
            "PkgVersion" => Ok(self.pkg_version(args.str(0)?)),
            "PkgSize" => Ok(self.pkg_size(args.str(0)?)),
            "PkgGroup" => Ok(self.pkg_group(args.str(0)?)),
            "PkgLocation" => Ok(self.pkg_location(args.str(0)?, false)),
            "PkgPath" => Ok(self.pkg_location(args.str(0)?, true)),
            "PkgProperties" => Ok(self.pkg_properties(args.str(0)?)),
            "PkgPropertiesAll" => Ok(self.pkg_properties_all(args.str(0)?)),
            "PkgGetFilelist" => Ok(self.pkg_file_list(args.str(0)?, args.symbol(1)?)),

            // Licenses
            "PkgGetLicenseToConfirm" => Ok(self.license_to_confirm(args.str(0)?).into()),
            "PkgGetLicensesToConfirm" => Ok(self.licenses_to_confirm(args.list(0)?)),
            "PkgMarkLicenseConfirmed" => Ok(self.mark_license_confirmed(args.str(0)?).into()),

            // Tagging
            "PkgInstall" => Ok(self.pkg_install(args.str(0)?).into()),
            "PkgSrcInstall" => Ok(self.pkg_src_install(args.str(0)?).into()),
            "PkgDelete" => Ok(self.pkg_delete(args.str(0)?).into()),
            "PkgTaboo" => Ok(self.pkg_taboo(args.str(0)?).into()),
            "PkgNeutral" => Ok(self.pkg_neutral(args.str(0)?).into()),
            "PkgReset" => Ok(self.pkg_reset().into()),
            "PkgApplReset" => Ok(self.pkg_appl_reset().into()),
            "DoProvide" => Ok(self.do_provide(args.list(0)?)),
            "DoRemove" => Ok(self.do_remove(args.list(0)?)),

            // Selection listing
            "GetPackages" => self.get_packages(args.symbol(0)?, args.bool(1)?),
            "FilterPackages" => Ok(self.filter_packages(
                args.bool(0)?,
                args.bool(1)?,
                args.bool(2)?,
                args.bool(3)?,
            )),
            "IsManualSelection" => Ok(self.is_manual_selection().into()),
            "IsAnyResolvable" => Ok(self.is_any_resolvable(args.symbol(0)?, args.symbol(1)?).into()),
            "PkgAnyToDelete" => {
                self.warn_once(op, "is obsolete, use IsAnyResolvable(`package, `to_remove)");
                Ok(self.is_any_resolvable("package", "to_remove").into())
            }
            "PkgAnyToInstall" => {
                self.warn_once(op, "is obsolete, use IsAnyResolvable(`package, `to_install)");
                Ok(self.is_any_resolvable("package", "to_install").into())
            }

            // Resolvables
            "ResolvableInstall" => Ok(self.resolvable_install(args.str(0)?, args.symbol(1)?).into()),
            "ResolvableRemove" => Ok(self.resolvable_remove(args.str(0)?, args.symbol(1)?).into()),
            "ResolvableNeutral" => Ok(self
                .resolvable_neutral(
                    args.str(0)?,
                    args.symbol(1)?,
                    args.opt_bool(2)?.unwrap_or(false),
                )
                .into()),
            "ResolvableSetSoftLock" => {
                Ok(self.resolvable_soft_lock(args.str(0)?, args.symbol(1)?).into())
            }
            "ResolvableProperties" => {
                Ok(self.resolvable_properties(args.str(0)?, args.symbol(1)?, args.str(2)?, false))
            }
            "ResolvableDependencies" => {
                Ok(self.resolvable_properties(args.str(0)?, args.symbol(1)?, args.str(2)?, true))
            }
            "ResolvableCountPatches" => Ok(self.set_patches(args.symbol(0)?, false).into()),
            "ResolvablePreselectPatches" => Ok(self.set_patches(args.symbol(0)?, true).into()),

            // Solver
            "PkgSolve" => Ok(self.solve().into()),
            "PkgSolveCheckTargetOnly" => Ok(self.solve_check_target_only().into()),
            "PkgSolveErrors" => Ok(self.solve_errors()),
            "PkgUpdateAll" => Ok(self.update_all(args.map(0)?)),
            "SetSolverFlags" => Ok(self.set_solver_flags(args.map(0)?).into()),
            "GetSolverFlags" => Ok(self.get_solver_flags()),
            "CreateSolverTestCase" => Ok(self.create_solver_testcase(args.str(0)?).into()),
            "SaveState" => Ok(self.save_state().into()),
            "RestoreState" => Ok(self
                .restore_state(args.opt_bool(0)?.unwrap_or(false))
                .into()),
            "ClearSaveState" => Ok(self.clear_save_state().into()),
            "PkgCommit" => self.commit(args.int(0)?),
            "PkgEstablish" => {
                self.warn_once(op, "is obsolete, it is not needed anymore");
                Ok(false.into())
            }
            "PkgFreshen" => {
                self.warn_once(op, "is obsolete, it is not needed anymore");
                Ok(true.into())
            }

            // Target
            "GetBackupPath" => Ok(self.get_backup_path()),
            "SetBackupPath" => Ok(self.set_backup_path(args.str(0)?)),
            "CreateBackups" => Ok(self.create_backups(args.bool(0)?)),
            "RpmChecksig" => Ok(self.rpm_checksig(args.str(0)?).into()),
            "SourceProvideOptionalFile" => {
                self.provide_optional_file(args.int(0)?, args.int(1)?, args.str(2)?)
            }

            // Media
            "PkgMediaNames" => Ok(self.media_names()),
            "PkgMediaSizes" => Ok(self.media_sizes()),
            "PkgMediaPackageSizes" => Ok(self.media_package_sizes()),
            "PkgMediaCount" => Ok(self.media_count()),

            // Errors
            "LastError" => Ok(self.last_error.borrow().message().into()),
            "LastErrorDetails" => Ok(self.last_error.borrow().details().into()),

            _ => Err(BridgeError::UnknownOperation(op.to_string())),
        }
    }

    /// Log a deprecation warning the first time `name` is used.
    fn warn_once(&self, name: &str, message: &str) {
        if self.warned.borrow_mut().insert(name.to_string()) {
            tracing::warn!("{name} {message}");
        }
    }

    fn set_last_error(&self, message: impl Into<String>, details: impl Into<String>) {
        self.last_error.borrow_mut().set(message, details);
    }

    /// Run engine work on a copy of the pool, then store the copy.
    ///
    /// The host may change the live pool from a callback while the engine
    /// runs. Those changes win over the engine's result.
    fn on_pool_copy<T>(&self, work: impl FnOnce(&mut Pool) -> T) -> T {
        let mut pool = self.pool.borrow().clone();
        let base = pool.statuses();
        let out = work(&mut pool);
        let mut live = self.pool.borrow_mut();
        pool.keep_changes(&base, &live);
        *live = pool;
        out
    }
}

impl std::fmt::Debug for PkgBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkgBindings")
            .field("ctx", &self.ctx)
            .field("pool", &self.pool.borrow().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
