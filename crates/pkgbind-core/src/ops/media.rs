//! Per-medium totals of the planned installation.

use super::PkgBindings;
use crate::pool::Fate;
use crate::repos::RepoId;
use pkgbind_schema::{ResKind, Resolvable, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    InstallSize,
    DownloadSize,
    Count,
}

impl Measure {
    fn of(self, resolvable: &Resolvable) -> u64 {
        match self {
            Self::InstallSize => resolvable.install_size,
            Self::DownloadSize => resolvable.download_size,
            Self::Count => 1,
        }
    }
}

impl PkgBindings {
    /// `[name, id]` for every active repository. The name falls back to
    /// the first URL, then to the alias.
    pub(super) fn media_names(&self) -> Value {
        let repos = self.ctx.repos();
        repos
            .active()
            .map(|(id, info)| {
                let name = if !info.name.is_empty() {
                    info.name.clone()
                } else if let Some(url) = info.urls.first() {
                    url.to_string()
                } else {
                    info.alias.clone()
                };
                Value::List(vec![name.into(), id.into()])
            })
            .collect()
    }

    pub(super) fn media_sizes(&self) -> Value {
        self.media_totals(Measure::InstallSize)
    }

    pub(super) fn media_package_sizes(&self) -> Value {
        self.media_totals(Measure::DownloadSize)
    }

    pub(super) fn media_count(&self) -> Value {
        self.media_totals(Measure::Count)
    }

    /// One list per active repository, indexed by medium number minus one.
    fn media_totals(&self, measure: Measure) -> Value {
        let active: Vec<(RepoId, String)> = self
            .ctx
            .repos()
            .active()
            .map(|(id, info)| (id, info.alias.clone()))
            .collect();
        let slot: HashMap<&str, usize> = active
            .iter()
            .enumerate()
            .map(|(i, (_, alias))| (alias.as_str(), i))
            .collect();

        let mut totals: Vec<Vec<u64>> = vec![Vec::new(); active.len()];
        let pool = self.pool.borrow();
        for sel in pool.by_kind(ResKind::Package) {
            if sel.fate() != Fate::ToInstall {
                continue;
            }
            let Some(candidate) = sel.candidate() else {
                continue;
            };
            let r = &candidate.resolvable;
            let Some(&i) = slot.get(r.repo_alias.as_str()) else {
                tracing::debug!(package = %r.name, repo = %r.repo_alias, "Repository not active");
                continue;
            };
            let medium = r.medium_nr.max(1) as usize;
            let media = &mut totals[i];
            if media.len() < medium {
                media.resize(medium, 0);
            }
            media[medium - 1] += measure.of(r);
        }

        totals
            .into_iter()
            .map(|media| media.into_iter().collect::<Value>())
            .collect()
    }
}
