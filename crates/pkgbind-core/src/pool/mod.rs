//! The pool of selectables the bindings query and tag.
//!
//! The engine loads instances into the pool; the bindings group them into
//! one [`Selectable`] per (kind, name) and drive their transact state. A
//! single saved-state slot supports the host's save/restore protocol.

mod selectable;
mod status;

pub use selectable::{Fate, PoolItem, SelStatus, Selectable};
pub use status::{ResStatus, TransactBy, TransactValue};

use pkgbind_schema::{
    CommitAction, CommitRequest, CommitResult, CommitStep, ItemId, ResKind, Resolvable,
};
use std::collections::HashMap;

/// Selection states `GetPackages` lists by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    Installed,
    Selected,
    Available,
    Removed,
    Locked,
    Taboo,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Selected => "selected",
            Self::Available => "available",
            Self::Removed => "removed",
            Self::Locked => "locked",
            Self::Taboo => "taboo",
        }
    }

    pub fn matches(&self, sel: &Selectable) -> bool {
        match self {
            Self::Installed => sel.has_installed(),
            Self::Selected => sel.fate() == Fate::ToInstall && sel.candidate().is_some(),
            Self::Available => sel.has_candidate(),
            Self::Removed => sel.fate() == Fate::ToDelete && sel.has_installed(),
            Self::Locked => sel.status() == SelStatus::Protected,
            Self::Taboo => sel.status() == SelStatus::Taboo,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installed" => Ok(Self::Installed),
            "selected" => Ok(Self::Selected),
            "available" => Ok(Self::Available),
            "removed" => Ok(Self::Removed),
            "locked" => Ok(Self::Locked),
            "taboo" => Ok(Self::Taboo),
            _ => Err(format!("Unknown status filter: {s}")),
        }
    }
}

/// Which authority levels `FilterPackages` keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactFilter {
    pub solver: bool,
    pub application: bool,
    pub user: bool,
}

impl TransactFilter {
    pub fn matches(&self, by: TransactBy) -> bool {
        match by {
            TransactBy::Solver => self.solver,
            TransactBy::ApplLow | TransactBy::ApplHigh => self.application,
            TransactBy::User => self.user,
        }
    }
}

type Snapshot = HashMap<ItemId, ResStatus>;

#[derive(Debug, Default, Clone)]
pub struct Pool {
    selectables: Vec<Selectable>,
    index: HashMap<(ResKind, String), usize>,
    next_id: u64,
    saved: Option<Snapshot>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance. Instances from the installed system join the
    /// installed side of their selectable.
    pub fn add(&mut self, resolvable: Resolvable) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let key = (resolvable.kind(), resolvable.name.clone());
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.selectables
                    .push(Selectable::new(resolvable.kind(), &resolvable.name));
                self.index.insert(key, self.selectables.len() - 1);
                self.selectables.len() - 1
            }
        };
        let system = resolvable.is_system();
        let item = PoolItem {
            id,
            resolvable,
            status: ResStatus::default(),
        };
        let sel = &mut self.selectables[idx];
        if system {
            sel.installed.push(item);
        } else {
            sel.available.push(item);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.selectables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectables.is_empty()
    }

    pub fn get(&self, kind: ResKind, name: &str) -> Option<&Selectable> {
        let idx = *self.index.get(&(kind, name.to_string()))?;
        self.selectables.get(idx)
    }

    pub fn get_mut(&mut self, kind: ResKind, name: &str) -> Option<&mut Selectable> {
        let idx = *self.index.get(&(kind, name.to_string()))?;
        self.selectables.get_mut(idx)
    }

    pub fn selectables(&self) -> impl Iterator<Item = &Selectable> {
        self.selectables.iter()
    }

    pub fn by_kind(&self, kind: ResKind) -> impl Iterator<Item = &Selectable> {
        self.selectables.iter().filter(move |s| s.kind() == kind)
    }

    pub fn by_kind_mut(&mut self, kind: ResKind) -> impl Iterator<Item = &mut Selectable> {
        self.selectables.iter_mut().filter(move |s| s.kind() == kind)
    }

    pub fn by_status(
        &self,
        kind: ResKind,
        filter: StatusFilter,
    ) -> impl Iterator<Item = &Selectable> {
        self.by_kind(kind).filter(move |s| filter.matches(s))
    }

    /// Package instances providing `tag`, either as a capability name or as
    /// an owned file.
    pub fn what_provides<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a PoolItem> {
        self.by_kind(ResKind::Package)
            .flat_map(Selectable::items)
            .filter(move |p| {
                p.resolvable.provides().any(|c| c == tag)
                    || p.resolvable.files.iter().any(|f| f == tag)
            })
    }

    pub fn item(&self, id: ItemId) -> Option<&PoolItem> {
        self.selectables
            .iter()
            .flat_map(Selectable::items)
            .find(|p| p.id == id)
    }

    pub fn any_transacting(&self, kind: ResKind) -> bool {
        self.by_kind(kind).any(|s| s.fate() != Fate::Unmodified)
    }

    /// Reset every selectable at `causer`. Returns `false` if any refused.
    pub fn reset_all(&mut self, causer: TransactBy) -> bool {
        let mut ok = true;
        for sel in &mut self.selectables {
            ok &= sel.unset(causer);
        }
        ok
    }

    /// Drop every solver-level change, keeping application and user ones.
    pub fn reset_solver_transacts(&mut self) {
        for sel in &mut self.selectables {
            for item in sel.items_mut() {
                if item.status.transacts() && item.status.by() == TransactBy::Solver {
                    item.status.set_transact(false, TransactBy::Solver);
                }
            }
        }
    }

    /// Plan of the pending changes, in pool order.
    pub fn commit_request(&self, restrict_to_medium: u32) -> CommitRequest {
        let mut steps = Vec::new();
        for sel in &self.selectables {
            for item in sel.installed().iter().filter(|p| p.status.transacts()) {
                steps.push(CommitStep {
                    id: item.id,
                    action: CommitAction::Delete,
                    resolvable: item.resolvable.clone(),
                });
            }
            for item in sel.available().iter().filter(|p| p.status.transacts()) {
                steps.push(CommitStep {
                    id: item.id,
                    action: CommitAction::Install,
                    resolvable: item.resolvable.clone(),
                });
            }
        }
        CommitRequest {
            restrict_to_medium,
            steps,
        }
    }

    /// Fold a finished commit back into the pool.
    ///
    /// Installed steps become the installed instance of their selectable,
    /// replacing older ones; deleted steps disappear. Steps that failed or
    /// were left out keep their pending state.
    pub fn apply_commit(&mut self, request: &CommitRequest, result: &CommitResult) {
        for step in request.steps.iter().filter(|s| result.succeeded(s.id)) {
            let key = (step.resolvable.kind(), step.resolvable.name.clone());
            let Some(&idx) = self.index.get(&key) else {
                tracing::warn!(item = %step.id, "Committed item is not in the pool");
                continue;
            };
            match step.action {
                CommitAction::Install => {
                    let id = ItemId(self.next_id);
                    self.next_id += 1;
                    let sel = &mut self.selectables[idx];
                    if let Some(item) = sel.find_mut(step.id) {
                        item.status = ResStatus::default();
                    }
                    sel.installed.clear();
                    sel.installed.push(PoolItem {
                        id,
                        resolvable: step.resolvable.clone().installed(),
                        status: ResStatus::default(),
                    });
                }
                CommitAction::Delete => {
                    self.selectables[idx].installed.retain(|p| p.id != step.id);
                }
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.selectables
            .iter()
            .flat_map(Selectable::items)
            .map(|p| (p.id, p.status))
            .collect()
    }

    /// Transact state of every item, the base for [`Pool::keep_changes`].
    pub fn statuses(&self) -> HashMap<ItemId, ResStatus> {
        self.snapshot()
    }

    /// Carry over changes made to `live` since `base` was taken.
    ///
    /// Items whose status in `live` moved away from `base` take the live
    /// status and the saved state is taken from `live`. Everything else keeps
    /// what this pool holds.
    pub fn keep_changes(&mut self, base: &HashMap<ItemId, ResStatus>, live: &Pool) {
        let changed: HashMap<ItemId, ResStatus> = live
            .selectables
            .iter()
            .flat_map(Selectable::items)
            .filter(|p| base.get(&p.id) != Some(&p.status))
            .map(|p| (p.id, p.status))
            .collect();
        for sel in &mut self.selectables {
            for item in sel.items_mut() {
                if let Some(status) = changed.get(&item.id) {
                    item.status = *status;
                }
            }
        }
        self.saved.clone_from(&live.saved);
    }

    pub fn save_state(&mut self) {
        self.saved = Some(self.snapshot());
    }

    pub fn has_saved_state(&self) -> bool {
        self.saved.is_some()
    }

    /// Whether the current state differs from the saved one. Without a
    /// saved state nothing differs.
    pub fn differs_from_saved(&self) -> bool {
        let Some(saved) = &self.saved else {
            return false;
        };
        self.selectables
            .iter()
            .flat_map(Selectable::items)
            .any(|p| saved.get(&p.id).is_some_and(|s| *s != p.status))
    }

    /// Put the saved state back. Returns `false` when nothing was saved.
    pub fn restore_state(&mut self) -> bool {
        let Some(saved) = self.saved.take() else {
            return false;
        };
        for sel in &mut self.selectables {
            for item in sel.items_mut() {
                if let Some(status) = saved.get(&item.id) {
                    item.status = *status;
                }
            }
        }
        self.saved = Some(saved);
        true
    }

    pub fn clear_state(&mut self) {
        self.saved = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgbind_schema::{DepKind, Edition};

    fn pool() -> Pool {
        let mut pool = Pool::new();
        pool.add(Resolvable::package("vim", Edition::new("9.0", "1")).installed());
        pool.add(Resolvable::package("vim", Edition::new("9.1", "1")).with_repo("oss", 1));
        pool.add(
            Resolvable::package("zypper", Edition::new("1.14", "1"))
                .with_repo("oss", 1)
                .with_dependency(DepKind::Provides, "y2pmsh")
                .with_files(["/usr/bin/zypper"]),
        );
        pool
    }

    #[test]
    fn test_grouping_by_identity() {
        let pool = pool();
        assert_eq!(pool.len(), 2);
        let vim = pool.get(ResKind::Package, "vim").unwrap();
        assert_eq!(vim.installed().len(), 1);
        assert_eq!(vim.available().len(), 1);
        assert!(pool.get(ResKind::Patch, "vim").is_none());
    }

    #[test]
    fn test_what_provides_by_capability_and_file() {
        let pool = pool();
        let by_cap: Vec<_> = pool.what_provides("y2pmsh").collect();
        assert_eq!(by_cap.len(), 1);
        assert_eq!(pool.what_provides("/usr/bin/zypper").count(), 1);
        assert_eq!(pool.what_provides("vim").count(), 2);
    }

    #[test]
    fn test_status_filters() {
        let mut pool = pool();
        pool.get_mut(ResKind::Package, "zypper")
            .unwrap()
            .set_to_install(TransactBy::ApplHigh);
        let names = |f| {
            pool.by_status(ResKind::Package, f)
                .map(|s| s.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(StatusFilter::Installed), vec!["vim"]);
        assert_eq!(names(StatusFilter::Selected), vec!["zypper"]);
        assert_eq!(names(StatusFilter::Available), vec!["vim", "zypper"]);
        assert!(names(StatusFilter::Removed).is_empty());
    }

    #[test]
    fn test_keep_changes_prefers_live_edits() {
        let live_before = pool();
        let base = live_before.statuses();

        let mut result = live_before.clone();
        result
            .get_mut(ResKind::Package, "vim")
            .unwrap()
            .set_to_install(TransactBy::Solver);

        let mut live = live_before;
        live.get_mut(ResKind::Package, "zypper")
            .unwrap()
            .set_taboo(TransactBy::User);
        live.save_state();

        result.keep_changes(&base, &live);
        assert_eq!(
            result.get(ResKind::Package, "vim").unwrap().status(),
            SelStatus::AutoUpdate
        );
        assert_eq!(
            result.get(ResKind::Package, "zypper").unwrap().status(),
            SelStatus::Taboo
        );
        assert!(result.has_saved_state());
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let mut pool = pool();
        let before = pool.clone();
        pool.save_state();
        assert!(!pool.differs_from_saved());
        pool.get_mut(ResKind::Package, "vim")
            .unwrap()
            .set_to_delete(TransactBy::User);
        assert!(pool.differs_from_saved());
        assert!(pool.restore_state());
        assert!(!pool.differs_from_saved());
        assert_eq!(pool.selectables, before.selectables);
        pool.clear_state();
        assert!(!pool.restore_state());
    }

    #[test]
    fn test_apply_commit_moves_installs() {
        let mut pool = pool();
        pool.get_mut(ResKind::Package, "vim")
            .unwrap()
            .set_to_install(TransactBy::User);
        let request = pool.commit_request(0);
        assert_eq!(request.steps.len(), 1);
        pool.apply_commit(&request, &CommitResult::default());
        let vim = pool.get(ResKind::Package, "vim").unwrap();
        assert_eq!(vim.installed().len(), 1);
        assert_eq!(vim.installed()[0].resolvable.edition.version, "9.1");
        assert!(vim.installed()[0].resolvable.is_system());
        assert_eq!(vim.fate(), Fate::Unmodified);
    }

    #[test]
    fn test_transact_filter_levels() {
        let filter = TransactFilter {
            application: true,
            ..Default::default()
        };
        assert!(filter.matches(TransactBy::ApplLow));
        assert!(filter.matches(TransactBy::ApplHigh));
        assert!(!filter.matches(TransactBy::User));
        assert!(!filter.matches(TransactBy::Solver));
    }
}
