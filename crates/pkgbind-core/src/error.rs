//! Error types of the bindings and of the contracts they call into.

use thiserror::Error;

/// Failure of a host callable.
#[derive(Error, Debug)]
pub enum HostError {
    /// The host has no callable with that name.
    #[error("Unknown host function: {0}")]
    UnknownFunction(String),

    /// The callable ran but failed.
    #[error("Host function {name} failed: {message}")]
    Failed { name: String, message: String },
}

/// Failure reported by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The user aborted the operation from a callback.
    #[error("Aborted by user")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Failure of a host-facing operation.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{op}: missing argument {index}")]
    MissingArgument { op: String, index: usize },

    #[error("{op}: argument {index} must be {expected}, got {got}")]
    BadArgument {
        op: String,
        index: usize,
        expected: &'static str,
        got: String,
    },

    #[error("Unknown resolvable kind: {0}")]
    UnknownKind(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The most recent failure of a host-visible operation.
///
/// The host reads it through `LastError()` and `LastErrorDetails()` after an
/// operation returned its failure value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastError {
    message: String,
    details: String,
}

impl LastError {
    pub fn set(&mut self, message: impl Into<String>, details: impl Into<String>) {
        self.message = message.into();
        self.details = details.into();
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.details.clear();
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}
