//! Transact state of a single pool item.

use std::fmt;

/// Authority that last changed an item's state.
///
/// Higher levels shadow lower ones: a change requested at a lower level
/// never overrides a state set at a higher level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TransactBy {
    #[default]
    Solver,
    ApplLow,
    ApplHigh,
    User,
}

impl TransactBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solver => "solver",
            Self::ApplLow => "appl_low",
            Self::ApplHigh => "appl_high",
            Self::User => "user",
        }
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Self::ApplLow | Self::ApplHigh)
    }
}

impl fmt::Display for TransactBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactValue {
    #[default]
    KeepState,
    Locked,
    Transact,
}

/// State bits of one installed or available item.
///
/// Every setter returns `false` and leaves the state untouched when the
/// change is not allowed at the requested level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResStatus {
    value: TransactValue,
    by: TransactBy,
    soft_lock: bool,
    license_confirmed: bool,
}

impl ResStatus {
    pub fn transacts(&self) -> bool {
        self.value == TransactValue::Transact
    }

    pub fn is_locked(&self) -> bool {
        self.value == TransactValue::Locked
    }

    pub fn is_soft_locked(&self) -> bool {
        self.soft_lock
    }

    pub fn license_confirmed(&self) -> bool {
        self.license_confirmed
    }

    pub fn by(&self) -> TransactBy {
        self.by
    }

    pub fn set_transact(&mut self, to_transact: bool, causer: TransactBy) -> bool {
        match (self.value, to_transact) {
            (TransactValue::Transact, true) => {
                if causer > self.by {
                    self.by = causer;
                }
                true
            }
            (TransactValue::Locked, true) => false,
            (TransactValue::KeepState, true) => {
                self.value = TransactValue::Transact;
                self.by = causer;
                true
            }
            (TransactValue::Transact, false) => {
                if self.by > causer {
                    return false;
                }
                self.value = TransactValue::KeepState;
                self.by = causer;
                true
            }
            (_, false) => true,
        }
    }

    /// Lock or unlock the item. Locking fails while a higher level wants
    /// it transacted; unlocking needs at least the level that locked.
    pub fn set_lock(&mut self, to_lock: bool, causer: TransactBy) -> bool {
        if to_lock {
            match self.value {
                TransactValue::Locked => {
                    if causer > self.by {
                        self.by = causer;
                    }
                    true
                }
                TransactValue::Transact if self.by > causer => false,
                _ => {
                    self.value = TransactValue::Locked;
                    self.by = causer;
                    true
                }
            }
        } else {
            match self.value {
                TransactValue::Locked if self.by > causer => false,
                TransactValue::Locked => {
                    self.value = TransactValue::KeepState;
                    self.by = TransactBy::Solver;
                    true
                }
                _ => true,
            }
        }
    }

    /// Drop a pending transact or lock set at or below `causer`.
    pub fn reset_transact(&mut self, causer: TransactBy) -> bool {
        let ok = match self.value {
            TransactValue::KeepState => true,
            TransactValue::Transact => self.set_transact(false, causer),
            TransactValue::Locked => self.set_lock(false, causer),
        };
        if ok && causer >= self.by {
            self.soft_lock = false;
        }
        ok
    }

    /// Keep the item as it is and discourage the solver from selecting it.
    pub fn set_soft_lock(&mut self, causer: TransactBy) -> bool {
        if !self.set_transact(false, causer) {
            return false;
        }
        if causer > self.by {
            self.by = causer;
        }
        self.soft_lock = true;
        true
    }

    pub fn set_license_confirmed(&mut self, confirmed: bool) {
        self.license_confirmed = confirmed;
    }
}
