//! Commit requests and results exchanged with the engine.

use crate::{ItemId, Resolvable};

/// What happens to one item during a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitAction {
    /// Install the (available) item.
    Install,
    /// Remove the (installed) item.
    Delete,
}

/// One step of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStep {
    /// Pool id of the item.
    pub id: ItemId,
    /// Install or delete.
    pub action: CommitAction,
    /// The item itself.
    pub resolvable: Resolvable,
}

/// Commit input handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    /// Only commit items from this medium; 0 commits everything.
    pub restrict_to_medium: u32,
    /// Steps in pool order.
    pub steps: Vec<CommitStep>,
}

/// Engine-side outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    /// Number of items committed.
    pub result: i64,
    /// Items that failed.
    pub errors: Vec<ItemId>,
    /// Items left out (e.g. on other media).
    pub remaining: Vec<ItemId>,
    /// Source packages left out.
    pub src_remaining: Vec<ItemId>,
}

impl CommitResult {
    /// Whether the step for `id` went through.
    pub fn succeeded(&self, id: ItemId) -> bool {
        !self.errors.contains(&id)
            && !self.remaining.contains(&id)
            && !self.src_remaining.contains(&id)
    }
}
