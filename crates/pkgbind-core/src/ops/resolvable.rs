//! Kind-generic resolvable operations.

use super::PkgBindings;
use super::package::APPLICATION;
use crate::pool::{Fate, PoolItem, Selectable, TransactBy};
use pkgbind_schema::{Details, Key, PatchInfo, ResKind, Value};
use std::collections::BTreeMap;

fn parse_kind(op: &str, symbol: &str) -> Option<ResKind> {
    let kind = symbol.parse().ok();
    if kind.is_none() {
        tracing::error!("{op}: unknown resolvable kind `{symbol}");
    }
    kind
}

/// Patch filter of `ResolvableCountPatches` and friends.
fn patch_filter(which: &str) -> Option<fn(&PatchInfo) -> bool> {
    let filter: fn(&PatchInfo) -> bool = match which {
        "all" => |_| true,
        "interactive" => |p| p.interactive,
        "reboot_needed" => |p| p.reboot_needed,
        "affects_pkg_manager" => |p| p.affects_pkg_manager,
        _ => return None,
    };
    Some(filter)
}

fn details_into(map: &mut BTreeMap<Key, Value>, item: &PoolItem) {
    let r = &item.resolvable;
    match &r.details {
        Details::Package | Details::SrcPackage => {}
        Details::Patch(patch) => {
            map.insert("interactive".into(), patch.interactive.into());
            map.insert("reboot_needed".into(), patch.reboot_needed.into());
            map.insert("affects_pkg_manager".into(), patch.affects_pkg_manager.into());
            map.insert("is_needed".into(), patch.needed.into());
        }
        Details::Pattern(pattern) => {
            map.insert("category".into(), pattern.category.as_str().into());
            map.insert("user_visible".into(), pattern.visible.into());
            map.insert("default".into(), pattern.default.into());
            map.insert("icon".into(), pattern.icon.as_str().into());
            map.insert("script".into(), pattern.script.as_str().into());
            map.insert("order".into(), pattern.order.as_str().into());
        }
        Details::Product(product) => {
            let short_name = if product.short_name.is_empty() {
                &r.summary
            } else {
                &product.short_name
            };
            map.insert("category".into(), product.category.as_str().into());
            map.insert("vendor".into(), r.vendor.as_str().into());
            map.insert("relnotes_url".into(), product.relnotes_url.as_str().into());
            map.insert("display_name".into(), r.summary.as_str().into());
            map.insert("short_name".into(), short_name.as_str().into());
            map.insert(
                "update_urls".into(),
                product.update_urls.iter().map(String::as_str).collect(),
            );
            map.insert(
                "flags".into(),
                product.flags.iter().map(String::as_str).collect(),
            );
        }
    }
}

fn dependencies(item: &PoolItem) -> Value {
    let mut deps: Vec<_> = item.resolvable.dependencies.iter().collect();
    deps.sort_by_key(|d| d.kind.as_str());
    deps.into_iter()
        .map(|d| {
            Value::map([
                ("res_kind", Value::from("package")),
                ("name", Value::from(d.capability.as_str())),
                ("dep_kind", Value::from(d.kind.as_str())),
            ])
        })
        .collect()
}

impl PkgBindings {
    /// Whether some selectable of `kind` is going to be installed or
    /// removed (`which` is `to_install`, `to_remove` or `any`).
    pub(super) fn is_any_resolvable(&self, kind: &str, which: &str) -> bool {
        let Some(kind) = parse_kind("IsAnyResolvable", kind) else {
            return false;
        };
        let wanted: fn(Fate) -> bool = match which {
            "to_install" => |f| f == Fate::ToInstall,
            "to_remove" => |f| f == Fate::ToDelete,
            "any" => |f| f != Fate::Unmodified,
            other => {
                tracing::error!("IsAnyResolvable: unknown symbol `{other}");
                return false;
            }
        };
        self.pool.borrow().by_kind(kind).any(|s| wanted(s.fate()))
    }

    /// Apply `f` to the selectable `name` of `kind`, or to every selectable
    /// of the kind when `name` is empty.
    fn for_resolvables(
        &self,
        op: &str,
        name: &str,
        kind: &str,
        mut f: impl FnMut(&mut Selectable) -> bool,
    ) -> bool {
        let Some(kind) = parse_kind(op, kind) else {
            return false;
        };
        let mut pool = self.pool.borrow_mut();
        if name.is_empty() {
            let mut ok = true;
            for sel in pool.by_kind_mut(kind) {
                ok &= f(sel);
            }
            return ok;
        }
        match pool.get_mut(kind, name) {
            Some(sel) => f(sel),
            None => {
                tracing::error!("{op}: {kind} {name} not found");
                false
            }
        }
    }

    pub(super) fn resolvable_install(&self, name: &str, kind: &str) -> bool {
        self.for_resolvables("ResolvableInstall", name, kind, |s| {
            s.set_to_install(APPLICATION)
        })
    }

    pub(super) fn resolvable_remove(&self, name: &str, kind: &str) -> bool {
        self.for_resolvables("ResolvableRemove", name, kind, |s| s.set_to_delete(APPLICATION))
    }

    /// Drop pending changes. With `force` user-level changes go as well.
    pub(super) fn resolvable_neutral(&self, name: &str, kind: &str, force: bool) -> bool {
        self.for_resolvables("ResolvableNeutral", name, kind, |s| {
            let ok = s.unset(APPLICATION);
            if force {
                let user = s.unset(TransactBy::User);
                ok && user
            } else {
                ok
            }
        })
    }

    pub(super) fn resolvable_soft_lock(&self, name: &str, kind: &str) -> bool {
        self.for_resolvables("ResolvableSetSoftLock", name, kind, |s| {
            s.set_soft_lock(APPLICATION)
        })
    }

    /// Property maps of every instance of `kind` matching `name` and
    /// `version`. Empty strings match everything.
    pub(super) fn resolvable_properties(
        &self,
        name: &str,
        kind: &str,
        version: &str,
        with_dependencies: bool,
    ) -> Value {
        let op = if with_dependencies {
            "ResolvableDependencies"
        } else {
            "ResolvableProperties"
        };
        let Some(kind) = parse_kind(op, kind) else {
            return Value::empty_list();
        };
        let pool = self.pool.borrow();
        let items: Vec<&PoolItem> = pool
            .by_kind(kind)
            .filter(|s| name.is_empty() || s.name() == name)
            .flat_map(Selectable::items)
            .filter(|p| version.is_empty() || p.resolvable.edition.to_string() == version)
            .collect();

        items
            .into_iter()
            .map(|item| {
                let r = &item.resolvable;
                let status = if r.is_system() {
                    "installed"
                } else if item.status.transacts() {
                    "selected"
                } else {
                    "available"
                };
                let mut map = BTreeMap::new();
                map.insert(Key::from("name"), r.name.as_str().into());
                map.insert("version".into(), r.edition.to_string().into());
                map.insert("arch".into(), r.arch.as_str().into());
                map.insert("description".into(), r.description.as_str().into());
                if !r.summary.is_empty() {
                    map.insert("summary".into(), r.summary.as_str().into());
                }
                map.insert("status".into(), Value::symbol(status));
                if item.status.transacts() {
                    map.insert("transact_by".into(), Value::symbol(item.status.by().as_str()));
                }
                map.insert("locked".into(), item.status.is_locked().into());
                map.insert(
                    "source".into(),
                    self.ctx.log_find_alias(&r.repo_alias).into(),
                );
                details_into(&mut map, item);
                if with_dependencies {
                    map.insert("dependencies".into(), dependencies(item));
                }
                Value::Map(map)
            })
            .collect()
    }

    /// Count the needed, non-optional patches matching `which`; with
    /// `preselect` also select them for installation.
    pub(super) fn set_patches(&self, which: &str, preselect: bool) -> i64 {
        let Some(filter) = patch_filter(which) else {
            tracing::error!("Unknown patch category `{which}");
            return 0;
        };
        let mut pool = self.pool.borrow_mut();
        let mut count = 0;
        for sel in pool.by_kind_mut(ResKind::Patch) {
            let matches = sel.candidate().is_some_and(|c| {
                c.resolvable
                    .patch()
                    .is_some_and(|p| p.needed && p.category != "optional" && filter(p))
            });
            if !matches {
                continue;
            }
            count += 1;
            if preselect && !sel.set_to_install(APPLICATION) {
                tracing::warn!("Cannot preselect patch {}", sel.name());
            }
        }
        tracing::info!(which, preselect, count, "Patches");
        count
    }
}
