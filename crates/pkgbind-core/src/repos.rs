//! Repository ids handed to the host.
//!
//! The engine identifies repositories by alias. The host works with small
//! integer ids assigned here in registration order and never reused.

use pkgbind_schema::SYSTEM_REPO_ALIAS;
use url::Url;

/// Host-visible repository id.
pub type RepoId = i64;

/// What the engine knows about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub alias: String,
    pub name: String,
    pub urls: Vec<Url>,
    pub enabled: bool,
}

impl RepoInfo {
    pub fn new(alias: &str, url: Url) -> Self {
        Self {
            alias: alias.to_string(),
            name: alias.to_string(),
            urls: vec![url],
            enabled: true,
        }
    }

    /// First base URL as a string, empty when the repository has none.
    pub fn first_url(&self) -> String {
        self.urls.first().map(Url::to_string).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct RepoEntry {
    pub info: RepoInfo,
    pub deleted: bool,
}

#[derive(Debug, Default)]
pub struct RepoTable {
    entries: Vec<RepoEntry>,
}

impl RepoTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository and return its new id.
    pub fn add(&mut self, info: RepoInfo) -> RepoId {
        tracing::debug!(alias = %info.alias, id = self.entries.len(), "Registering repository");
        self.entries.push(RepoEntry {
            info,
            deleted: false,
        });
        (self.entries.len() - 1) as RepoId
    }

    /// Mark a repository deleted. Its id stays taken.
    pub fn delete(&mut self, id: RepoId) -> bool {
        match self.entry_mut(id) {
            Some(entry) if !entry.deleted => {
                entry.deleted = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_enabled(&mut self, id: RepoId, enabled: bool) -> bool {
        match self.entry_mut(id) {
            Some(entry) if !entry.deleted => {
                entry.info.enabled = enabled;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: RepoId) -> Option<&RepoEntry> {
        usize::try_from(id).ok().and_then(|i| self.entries.get(i))
    }

    fn entry_mut(&mut self, id: RepoId) -> Option<&mut RepoEntry> {
        usize::try_from(id).ok().and_then(|i| self.entries.get_mut(i))
    }

    pub fn find_alias(&self, alias: &str) -> Option<RepoId> {
        self.entries
            .iter()
            .position(|e| !e.deleted && e.info.alias == alias)
            .map(|i| i as RepoId)
    }

    /// Id for `alias`, or -1 with a logged warning. The installed system
    /// maps to -1 silently.
    pub fn log_find_alias(&self, alias: &str) -> RepoId {
        if alias == SYSTEM_REPO_ALIAS {
            return -1;
        }
        self.find_alias(alias).unwrap_or_else(|| {
            tracing::warn!("Repository with alias '{alias}' not found");
            -1
        })
    }

    /// Enabled, not deleted repositories with their ids.
    pub fn active(&self) -> impl Iterator<Item = (RepoId, &RepoInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.deleted && e.info.enabled)
            .map(|(i, e)| (i as RepoId, &e.info))
    }
}
