//! Shared vocabulary of the package-engine host bindings.
//!
//! Everything here is plain data: the value model exchanged with the host
//! runtime, the closed set of callback event ids, resolvable instances and
//! the action codes the engine understands.

pub mod commit;
pub mod edition;
pub mod event;
pub mod key;
pub mod kind;
pub mod report;
pub mod resolvable;
pub mod stats;
pub mod value;

// Re-exports
pub use commit::*;
pub use edition::Edition;
pub use event::{EventId, OBSOLETE_REGISTRATIONS};
pub use key::PublicKey;
pub use kind::*;
pub use report::*;
pub use resolvable::*;
pub use stats::UpgradeStatistics;
pub use value::{Key, Value};

/// Repository id reported for instances that live in the installed system.
pub const SYSTEM_REPO_ID: i64 = -1;

/// Alias the engine uses for the installed system repository.
pub const SYSTEM_REPO_ALIAS: &str = "@System";
