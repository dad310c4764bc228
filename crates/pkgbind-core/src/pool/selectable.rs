//! Per-identity view over installed and available instances.

use super::status::{ResStatus, TransactBy};
use pkgbind_schema::{ItemId, ResKind, Resolvable};
use std::fmt;

/// One instance in the pool together with its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolItem {
    pub id: ItemId,
    pub resolvable: Resolvable,
    pub status: ResStatus,
}

/// Pending outcome of a selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fate {
    Unmodified,
    ToInstall,
    ToDelete,
}

/// Combined status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelStatus {
    /// Installed and locked.
    Protected,
    /// Not installed and locked.
    Taboo,
    Del,
    Update,
    Install,
    AutoDel,
    AutoUpdate,
    AutoInstall,
    KeepInstalled,
    NoInst,
}

impl SelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protected => "S_Protected",
            Self::Taboo => "S_Taboo",
            Self::Del => "S_Del",
            Self::Update => "S_Update",
            Self::Install => "S_Install",
            Self::AutoDel => "S_AutoDel",
            Self::AutoUpdate => "S_AutoUpdate",
            Self::AutoInstall => "S_AutoInstall",
            Self::KeepInstalled => "S_KeepInstalled",
            Self::NoInst => "S_NoInst",
        }
    }
}

impl fmt::Display for SelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All instances of one (kind, name) identity.
///
/// The candidate is the available instance set to install, or else the
/// highest edition available. The selectable transacts through exactly one
/// side at a time: the candidate for installs, the installed instances for
/// deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectable {
    kind: ResKind,
    name: String,
    pub(crate) installed: Vec<PoolItem>,
    pub(crate) available: Vec<PoolItem>,
}

impl Selectable {
    pub fn new(kind: ResKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            installed: Vec::new(),
            available: Vec::new(),
        }
    }

    pub fn kind(&self) -> ResKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn installed(&self) -> &[PoolItem] {
        &self.installed
    }

    pub fn available(&self) -> &[PoolItem] {
        &self.available
    }

    pub fn items(&self) -> impl Iterator<Item = &PoolItem> {
        self.installed.iter().chain(self.available.iter())
    }

    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut PoolItem> {
        self.installed.iter_mut().chain(self.available.iter_mut())
    }

    pub fn installed_obj(&self) -> Option<&PoolItem> {
        self.installed.first()
    }

    pub fn has_installed(&self) -> bool {
        !self.installed.is_empty()
    }

    fn candidate_index(&self) -> Option<usize> {
        if let Some(i) = self.available.iter().position(|p| p.status.transacts()) {
            return Some(i);
        }
        self.available
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.resolvable.edition.cmp(&b.resolvable.edition))
            .map(|(i, _)| i)
    }

    pub fn candidate(&self) -> Option<&PoolItem> {
        self.candidate_index().map(|i| &self.available[i])
    }

    pub fn has_candidate(&self) -> bool {
        !self.available.is_empty()
    }

    /// The installed instance when there is one, otherwise the candidate.
    pub fn the_obj(&self) -> Option<&PoolItem> {
        self.installed_obj().or_else(|| self.candidate())
    }

    pub fn fate(&self) -> Fate {
        if self.candidate().is_some_and(|c| c.status.transacts()) {
            Fate::ToInstall
        } else if self.installed.iter().any(|p| p.status.transacts()) {
            Fate::ToDelete
        } else {
            Fate::Unmodified
        }
    }

    /// Level of the pending change, if any.
    pub fn transact_by(&self) -> Option<TransactBy> {
        self.items()
            .filter(|p| p.status.transacts())
            .map(|p| p.status.by())
            .max()
    }

    pub fn status(&self) -> SelStatus {
        let auto = self.transact_by() == Some(TransactBy::Solver);
        match (self.fate(), self.has_installed()) {
            (Fate::ToInstall, true) if auto => SelStatus::AutoUpdate,
            (Fate::ToInstall, true) => SelStatus::Update,
            (Fate::ToInstall, false) if auto => SelStatus::AutoInstall,
            (Fate::ToInstall, false) => SelStatus::Install,
            (Fate::ToDelete, _) if auto => SelStatus::AutoDel,
            (Fate::ToDelete, _) => SelStatus::Del,
            (Fate::Unmodified, true) => {
                if self.installed.iter().any(|p| p.status.is_locked()) {
                    SelStatus::Protected
                } else {
                    SelStatus::KeepInstalled
                }
            }
            (Fate::Unmodified, false) => {
                if self.candidate().is_some_and(|c| c.status.is_locked()) {
                    SelStatus::Taboo
                } else {
                    SelStatus::NoInst
                }
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.status(), SelStatus::Protected | SelStatus::Taboo)
    }

    pub fn is_soft_locked(&self) -> bool {
        self.available.iter().any(|p| p.status.is_soft_locked())
    }

    pub fn set_to_install(&mut self, causer: TransactBy) -> bool {
        let Some(i) = self.candidate_index() else {
            return false;
        };
        if self.available[i].status.transacts() && self.available[i].status.by() > causer {
            return true;
        }
        if !self
            .installed
            .iter_mut()
            .all(|p| p.status.reset_transact(causer))
        {
            return false;
        }
        self.available[i].status.set_transact(true, causer)
    }

    pub fn set_to_delete(&mut self, causer: TransactBy) -> bool {
        if self.installed.is_empty() {
            return false;
        }
        if let Some(i) = self.candidate_index()
            && !self.available[i].status.reset_transact(causer)
        {
            return false;
        }
        let mut ok = true;
        for item in &mut self.installed {
            ok &= item.status.set_transact(true, causer);
        }
        ok
    }

    /// Lock a not-installed selectable so it cannot be installed.
    pub fn set_taboo(&mut self, causer: TransactBy) -> bool {
        if self.has_installed() || self.available.is_empty() {
            return false;
        }
        let mut ok = true;
        for item in &mut self.available {
            ok &= item.status.set_lock(true, causer);
        }
        ok
    }

    /// Lock an installed selectable so it is neither removed nor updated.
    pub fn set_protected(&mut self, causer: TransactBy) -> bool {
        if !self.has_installed() {
            return false;
        }
        let mut ok = true;
        for item in self.items_mut() {
            ok &= item.status.set_lock(true, causer);
        }
        ok
    }

    /// Drop pending changes and locks set at or below `causer`.
    pub fn unset(&mut self, causer: TransactBy) -> bool {
        let mut ok = true;
        for item in self.items_mut() {
            ok &= item.status.reset_transact(causer);
        }
        ok
    }

    pub fn set_soft_lock(&mut self, causer: TransactBy) -> bool {
        let mut ok = true;
        for item in &mut self.available {
            ok &= item.status.set_soft_lock(causer);
        }
        ok
    }

    /// Confirm the candidate's license. Only a candidate set to install
    /// with an unconfirmed license qualifies.
    pub fn confirm_license(&mut self) -> bool {
        let Some(i) = self.candidate_index() else {
            return false;
        };
        let status = &mut self.available[i].status;
        if !status.transacts() || status.license_confirmed() {
            return false;
        }
        status.set_license_confirmed(true);
        true
    }

    pub(crate) fn find_mut(&mut self, id: ItemId) -> Option<&mut PoolItem> {
        self.items_mut().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgbind_schema::Edition;

    fn item(id: u64, version: &str) -> PoolItem {
        PoolItem {
            id: ItemId(id),
            resolvable: Resolvable::package("zypper", Edition::new(version, "1")),
            status: ResStatus::default(),
        }
    }

    fn available(versions: &[&str]) -> Selectable {
        let mut s = Selectable::new(ResKind::Package, "zypper");
        for (i, v) in versions.iter().enumerate() {
            s.available.push(item(i as u64, v));
        }
        s
    }

    #[test]
    fn test_candidate_is_highest_edition() {
        let s = available(&["1.0", "1.10", "1.9"]);
        assert_eq!(s.candidate().unwrap().resolvable.edition.version, "1.10");
        assert_eq!(s.the_obj().unwrap().id, ItemId(1));
    }

    #[test]
    fn test_install_then_neutral() {
        let mut s = available(&["1.0"]);
        assert!(s.set_to_install(TransactBy::ApplHigh));
        assert_eq!(s.fate(), Fate::ToInstall);
        assert_eq!(s.transact_by(), Some(TransactBy::ApplHigh));
        assert_eq!(s.status(), SelStatus::Install);
        assert!(s.unset(TransactBy::ApplHigh));
        assert_eq!(s.fate(), Fate::Unmodified);
        assert_eq!(s.status(), SelStatus::NoInst);
    }

    #[test]
    fn test_taboo_blocks_install() {
        let mut s = available(&["1.0"]);
        assert!(s.set_taboo(TransactBy::User));
        assert_eq!(s.status(), SelStatus::Taboo);
        assert!(!s.set_to_install(TransactBy::ApplHigh));
        assert_ne!(s.fate(), Fate::ToInstall);
        assert!(!s.unset(TransactBy::ApplHigh));
        assert!(s.unset(TransactBy::User));
        assert_eq!(s.status(), SelStatus::NoInst);
    }

    #[test]
    fn test_delete_needs_installed() {
        let mut s = available(&["1.0"]);
        assert!(!s.set_to_delete(TransactBy::ApplHigh));
        s.installed.push(item(9, "0.9"));
        assert!(s.set_to_delete(TransactBy::ApplHigh));
        assert_eq!(s.fate(), Fate::ToDelete);
        assert_eq!(s.status(), SelStatus::Del);
    }

    #[test]
    fn test_solver_transact_is_auto() {
        let mut s = available(&["1.0"]);
        s.installed.push(item(9, "0.9"));
        assert!(s.set_to_install(TransactBy::Solver));
        assert_eq!(s.status(), SelStatus::AutoUpdate);
    }

    #[test]
    fn test_confirm_license_once() {
        let mut s = available(&["1.0"]);
        assert!(!s.confirm_license());
        s.set_to_install(TransactBy::User);
        assert!(s.confirm_license());
        assert!(!s.confirm_license());
    }

    #[test]
    fn test_protected_when_installed_locked() {
        let mut s = available(&["1.0"]);
        s.installed.push(item(9, "0.9"));
        assert!(s.set_protected(TransactBy::User));
        assert_eq!(s.status(), SelStatus::Protected);
        assert!(s.is_locked());
    }
}
