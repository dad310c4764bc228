//! pkgbind - package engine bindings for a host scripting runtime
//!
//! Two halves share one dispatch context:
//!
//! - **Callback dispatch**: the host registers callables by event id. One
//!   receiver per engine event class turns engine reports into host calls
//!   and maps the replies back to engine actions.
//! - **Resolvable transactions**: named operations query the pool, tag
//!   selectables for install or removal, run the solver and commit.
//!
//! Everything runs on the host's thread. The host may call back into the
//! bindings from inside any callback.
//!
//! ```text
//! host ──call(op)──▶ PkgBindings ──▶ Engine
//!   ▲                                  │ reports
//!   └──── callbacks ◀── Receivers ◀────┘
//! ```

pub mod base_product;
pub mod callbacks;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;
pub mod ops;
pub mod pool;
pub mod receivers;
pub mod report;
pub mod repos;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod throttle;

// Re-exports for convenience
pub use config::BridgeConfig;
pub use context::{DispatchContext, ProbeMode};
pub use engine::{Engine, SolverFlags};
pub use error::{BridgeError, EngineError, HostError, LastError};
pub use host::{Host, NullHost};
pub use ops::PkgBindings;
pub use pool::{Pool, TransactBy};
pub use repos::{RepoId, RepoInfo};
pub use throttle::ThrottleConfig;
