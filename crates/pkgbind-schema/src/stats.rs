//! Counters reported by the upgrade planner.

/// Upgrade planner statistics.
///
/// The planner fills the `chk_*` counters while it walks the installed
/// system; the `total_*` helpers derive the sums shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeStatistics {
    /// Accept downgrades without asking.
    pub silent_downgrades: bool,
    /// Delete installed packages no repository provides any more.
    pub delete_unmaintained: bool,

    /// Items already set to install before planning.
    pub chk_already_toins: u64,
    /// Items updated.
    pub chk_to_update: u64,
    /// Items downgraded.
    pub chk_to_downgrade: u64,
    /// Items replaced through obsoletes.
    pub chk_replaced: u64,
    /// Items replaced by guessing a successor.
    pub chk_replaced_guessed: u64,
    /// Items added because a package was split.
    pub chk_add_split: u64,

    /// Items already set to delete before planning.
    pub chk_already_todel: u64,

    /// Items kept because they are taboo.
    pub chk_is_taboo: u64,
    /// Items kept because only an older edition is available.
    pub chk_to_keep_downgrade: u64,
    /// Items kept because the installed edition is current.
    pub chk_to_keep_installed: u64,
    /// Items no repository provides any more.
    pub chk_dropped: u64,

    /// Installed items examined.
    pub chk_installed_total: u64,
}

impl UpgradeStatistics {
    /// Items the upgrade will install.
    pub fn total_to_install(&self) -> u64 {
        self.chk_already_toins
            + self.chk_to_update
            + self.chk_to_downgrade
            + self.chk_replaced
            + self.chk_replaced_guessed
            + self.chk_add_split
    }

    /// Items the upgrade will delete. Dropped items count here when
    /// unmaintained packages are deleted.
    pub fn total_to_delete(&self) -> u64 {
        let dropped = if self.delete_unmaintained {
            self.chk_dropped
        } else {
            0
        };
        self.chk_already_todel + dropped
    }

    /// Items the upgrade keeps. Dropped items count here unless
    /// unmaintained packages are deleted.
    pub fn total_to_keep(&self) -> u64 {
        let dropped = if self.delete_unmaintained {
            0
        } else {
            self.chk_dropped
        };
        self.chk_is_taboo + self.chk_to_keep_downgrade + self.chk_to_keep_installed + dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_moves_between_delete_and_keep() {
        let mut stats = UpgradeStatistics {
            chk_dropped: 3,
            chk_already_todel: 1,
            chk_is_taboo: 2,
            ..Default::default()
        };
        assert_eq!(stats.total_to_delete(), 1);
        assert_eq!(stats.total_to_keep(), 5);

        stats.delete_unmaintained = true;
        assert_eq!(stats.total_to_delete(), 4);
        assert_eq!(stats.total_to_keep(), 2);
    }
}
