//! Package queries and tagging.

use super::PkgBindings;
use crate::error::BridgeError;
use crate::pool::{Fate, PoolItem, Selectable, StatusFilter, TransactBy, TransactFilter};
use crate::receivers::file_name;
use pkgbind_schema::{Key, ResKind, Value};
use std::collections::BTreeMap;

/// Level the host's own selections are made at.
pub(super) const APPLICATION: TransactBy = TransactBy::ApplHigh;

/// `name` alone, or `"name version release arch"`.
fn package_entry(item: &PoolItem, names_only: bool) -> Value {
    let r = &item.resolvable;
    if names_only {
        Value::from(r.name.as_str())
    } else {
        Value::from(format!(
            "{} {} {} {}",
            r.name, r.edition.version, r.edition.release, r.arch
        ))
    }
}

impl PkgBindings {
    fn with_package<T>(&self, name: &str, f: impl FnOnce(&Selectable) -> T) -> Option<T> {
        self.pool.borrow().get(ResKind::Package, name).map(f)
    }

    fn with_package_mut<T>(&self, name: &str, f: impl FnOnce(&mut Selectable) -> T) -> Option<T> {
        self.pool.borrow_mut().get_mut(ResKind::Package, name).map(f)
    }

    pub(super) fn pkg_installed(&self, name: &str) -> Result<Value, BridgeError> {
        if name.is_empty() {
            tracing::warn!("PkgInstalled: empty package name");
            return Ok(Value::Void);
        }
        let installed = self
            .with_package(name, Selectable::has_installed)
            .unwrap_or(false);
        Ok(installed.into())
    }

    pub(super) fn pkg_available(&self, name: &str) -> Result<Value, BridgeError> {
        if name.is_empty() {
            tracing::warn!("PkgAvailable: empty package name");
            return Ok(Value::Void);
        }
        let available = self
            .with_package(name, Selectable::has_candidate)
            .unwrap_or(false);
        Ok(available.into())
    }

    fn any_provider(&self, tag: &str, pred: impl Fn(&PoolItem) -> bool) -> bool {
        if tag.is_empty() {
            return false;
        }
        self.pool.borrow().what_provides(tag).any(pred)
    }

    /// Some installed package provides `tag`.
    pub(super) fn is_provided(&self, tag: &str) -> bool {
        self.any_provider(tag, |p| p.resolvable.is_system())
    }

    /// Some package providing `tag` is going to be installed.
    pub(super) fn is_selected(&self, tag: &str) -> bool {
        self.any_provider(tag, |p| !p.resolvable.is_system() && p.status.transacts())
    }

    /// Some available package provides `tag`.
    pub(super) fn is_available(&self, tag: &str) -> bool {
        self.any_provider(tag, |p| !p.resolvable.is_system())
    }

    pub(super) fn query_provides(&self, tag: &str) -> Value {
        let pool = self.pool.borrow();
        pool.what_provides(tag)
            .map(|p| {
                let system = p.resolvable.is_system();
                let installed = system && !p.status.transacts();
                let instance = if installed { "BOTH" } else { "CAND" };
                let on_system = if system == p.status.transacts() {
                    "NONE"
                } else if installed {
                    "INST"
                } else {
                    "CAND"
                };
                Value::List(vec![
                    Value::from(p.resolvable.name.as_str()),
                    Value::symbol(instance),
                    Value::symbol(on_system),
                ])
            })
            .collect()
    }

    fn the_obj_value(&self, name: &str, f: impl FnOnce(&PoolItem) -> Value) -> Value {
        self.with_package(name, |s| s.the_obj().map(f))
            .flatten()
            .unwrap_or_default()
    }

    pub(super) fn pkg_summary(&self, name: &str) -> Value {
        self.the_obj_value(name, |p| p.resolvable.summary.as_str().into())
    }

    pub(super) fn pkg_version(&self, name: &str) -> Value {
        self.the_obj_value(name, |p| p.resolvable.edition.to_string().into())
    }

    pub(super) fn pkg_size(&self, name: &str) -> Value {
        self.the_obj_value(name, |p| p.resolvable.install_size.into())
    }

    pub(super) fn pkg_group(&self, name: &str) -> Value {
        self.the_obj_value(name, |p| p.resolvable.group.as_str().into())
    }

    /// File name of the package on its medium, or the whole path.
    pub(super) fn pkg_location(&self, name: &str, full_path: bool) -> Value {
        self.the_obj_value(name, |p| {
            let location = p.resolvable.location.as_str();
            if full_path {
                location.into()
            } else {
                file_name(location).into()
            }
        })
    }

    fn pkg_prop(&self, item: &PoolItem) -> Value {
        let r = &item.resolvable;
        let status = match (r.is_system(), item.status.transacts()) {
            (true, true) => "removed",
            (true, false) => "installed",
            (false, true) => "selected",
            (false, false) => "available",
        };
        Value::map([
            ("arch", Value::from(r.arch.as_str())),
            ("medianr", Value::from(r.medium_nr)),
            ("srcid", Value::from(self.ctx.log_find_alias(&r.repo_alias))),
            ("status", Value::symbol(status)),
            ("location", Value::from(file_name(&r.location))),
            ("path", Value::from(r.location.as_str())),
        ])
    }

    pub(super) fn pkg_properties(&self, name: &str) -> Value {
        let item = self
            .with_package(name, |s| s.the_obj().cloned())
            .flatten();
        item.map(|p| self.pkg_prop(&p)).unwrap_or_default()
    }

    /// Every installed and available instance of `name`.
    pub(super) fn pkg_properties_all(&self, name: &str) -> Value {
        if name.is_empty() {
            return Value::empty_list();
        }
        let items: Vec<PoolItem> = self
            .with_package(name, |s| s.items().cloned().collect())
            .unwrap_or_default();
        items.iter().map(|p| self.pkg_prop(p)).collect()
    }

    pub(super) fn pkg_file_list(&self, name: &str, which: &str) -> Value {
        let files = self.with_package(name, |s| {
            let item = match which {
                "any" => s.the_obj(),
                "installed" => s.installed_obj(),
                "candidate" => s.candidate(),
                other => {
                    tracing::error!("PkgGetFilelist: unknown symbol `{other}");
                    None
                }
            };
            item.map(|p| p.resolvable.files.clone()).unwrap_or_default()
        });
        files
            .unwrap_or_default()
            .into_iter()
            .map(Value::from)
            .collect()
    }

    /// License of the candidate if it is going to be installed and the
    /// license is not confirmed yet; empty otherwise.
    pub(super) fn license_to_confirm(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        self.with_package(name, |s| match s.candidate() {
            Some(c) if s.fate() == Fate::ToInstall && !c.status.license_confirmed() => {
                c.resolvable.license_to_confirm.clone()
            }
            _ => String::new(),
        })
        .unwrap_or_default()
    }

    pub(super) fn licenses_to_confirm(&self, names: &[Value]) -> Value {
        let mut map = BTreeMap::new();
        for name in names.iter().filter_map(Value::as_str) {
            let license = self.license_to_confirm(name);
            if !license.is_empty() {
                map.insert(Key::from(name), Value::from(license));
            }
        }
        Value::Map(map)
    }

    pub(super) fn mark_license_confirmed(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.with_package_mut(name, Selectable::confirm_license)
            .unwrap_or(false)
    }

    fn tag(&self, kind: ResKind, name: &str, f: impl FnOnce(&mut Selectable) -> bool) -> bool {
        if name.is_empty() {
            return false;
        }
        let mut pool = self.pool.borrow_mut();
        match pool.get_mut(kind, name) {
            Some(sel) => f(sel),
            None => {
                tracing::error!("{kind} {name} is not available");
                false
            }
        }
    }

    pub(super) fn pkg_install(&self, name: &str) -> bool {
        self.tag(ResKind::Package, name, |s| s.set_to_install(APPLICATION))
    }

    pub(super) fn pkg_src_install(&self, name: &str) -> bool {
        self.tag(ResKind::SrcPackage, name, |s| s.set_to_install(APPLICATION))
    }

    pub(super) fn pkg_delete(&self, name: &str) -> bool {
        self.tag(ResKind::Package, name, |s| s.set_to_delete(APPLICATION))
    }

    /// Taboo is set at user level so a solver reset keeps it.
    pub(super) fn pkg_taboo(&self, name: &str) -> bool {
        self.tag(ResKind::Package, name, |s| s.set_taboo(TransactBy::User))
    }

    pub(super) fn pkg_neutral(&self, name: &str) -> bool {
        self.tag(ResKind::Package, name, |s| s.unset(APPLICATION))
    }

    pub(super) fn pkg_reset(&self) -> bool {
        self.pool.borrow_mut().reset_all(TransactBy::User)
    }

    pub(super) fn pkg_appl_reset(&self) -> bool {
        self.pool.borrow_mut().reset_all(APPLICATION)
    }

    /// Select packages by name; returns the reason for each one that could
    /// not be selected.
    pub(super) fn do_provide(&self, tags: &[Value]) -> Value {
        let mut failed = BTreeMap::new();
        for tag in tags {
            let Some(name) = tag.as_str() else {
                tracing::error!("DoProvide: not a string: {tag}");
                continue;
            };
            let reason = match self.with_package_mut(name, |s| s.set_to_install(APPLICATION)) {
                Some(true) => continue,
                Some(false) => "The package cannot be selected to install.",
                None => "The package is not available.",
            };
            tracing::warn!("DoProvide {name}: {reason}");
            failed.insert(Key::from(name), Value::from(reason));
        }
        Value::Map(failed)
    }

    pub(super) fn do_remove(&self, tags: &[Value]) -> Value {
        for tag in tags {
            let Some(name) = tag.as_str() else {
                tracing::error!("DoRemove: not a string: {tag}");
                continue;
            };
            if !self
                .with_package_mut(name, |s| s.set_to_delete(APPLICATION))
                .unwrap_or(false)
            {
                tracing::warn!("DoRemove: cannot remove {name}");
            }
        }
        Value::Map(BTreeMap::new())
    }

    pub(super) fn get_packages(&self, which: &str, names_only: bool) -> Result<Value, BridgeError> {
        let filter: StatusFilter = which.parse().map_err(|_| BridgeError::BadArgument {
            op: "GetPackages".to_string(),
            index: 0,
            expected: "`installed, `selected, `available, `removed, `locked or `taboo",
            got: format!("`{which}"),
        })?;
        let pool = self.pool.borrow();
        let packages = pool
            .by_status(ResKind::Package, filter)
            .filter_map(|s| match filter {
                StatusFilter::Installed | StatusFilter::Removed | StatusFilter::Locked => {
                    s.installed_obj()
                }
                StatusFilter::Selected | StatusFilter::Available | StatusFilter::Taboo => {
                    s.candidate()
                }
            })
            .map(|p| package_entry(p, names_only))
            .collect();
        Ok(packages)
    }

    /// Packages going to be installed, filtered by who selected them.
    pub(super) fn filter_packages(
        &self,
        by_solver: bool,
        by_application: bool,
        by_user: bool,
        names_only: bool,
    ) -> Value {
        let filter = TransactFilter {
            solver: by_solver,
            application: by_application,
            user: by_user,
        };
        let pool = self.pool.borrow();
        pool.by_kind(ResKind::Package)
            .filter(|s| s.fate() == Fate::ToInstall)
            .filter(|s| s.transact_by().is_some_and(|by| filter.matches(by)))
            .filter_map(Selectable::candidate)
            .map(|p| package_entry(p, names_only))
            .collect()
    }

    /// Whether the user changed any package.
    pub(super) fn is_manual_selection(&self) -> bool {
        self.pool
            .borrow()
            .by_kind(ResKind::Package)
            .any(|s| s.fate() != Fate::Unmodified && s.transact_by() == Some(TransactBy::User))
    }
}
