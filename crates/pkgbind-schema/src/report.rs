//! Error kinds and action codes of engine reports.

use std::fmt;
use url::Url;

/// Error kind carried by engine reports.
///
/// Each report class uses a subset; the host sees the uppercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportError {
    /// Success.
    #[default]
    NoError,
    /// Resource not found.
    NotFound,
    /// I/O failure.
    Io,
    /// Recoverable I/O failure (e.g. a timeout).
    IoSoft,
    /// Invalid data.
    Invalid,
    /// Wrong medium inserted.
    Wrong,
    /// Rejected by the user or a policy.
    Rejected,
    /// Anything else.
    Unknown,
}

impl ReportError {
    /// Uppercase name handed to the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "NO_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Io => "IO",
            Self::IoSoft => "IO_SOFT",
            Self::Invalid => "INVALID",
            Self::Wrong => "WRONG",
            Self::Rejected => "REJECTED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Numeric code handed to the host by the `Done*` callbacks.
    pub fn code(&self) -> i64 {
        match self {
            Self::NoError => 0,
            Self::NotFound => 1,
            Self::Io => 2,
            Self::Invalid => 3,
            Self::IoSoft => 4,
            Self::Wrong => 5,
            Self::Rejected => 6,
            Self::Unknown => 7,
        }
    }

    /// Whether this is [`ReportError::NoError`].
    pub fn is_ok(&self) -> bool {
        *self == Self::NoError
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision returned to the engine after a problem report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemAction {
    /// Give up the whole operation.
    Abort,
    /// Try again.
    Retry,
    /// Skip this item and continue.
    Ignore,
}

impl ProblemAction {
    /// Upper-case action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "ABORT",
            Self::Retry => "RETRY",
            Self::Ignore => "IGNORE",
        }
    }
}

impl fmt::Display for ProblemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision returned to the engine after a media-change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAction {
    /// Give up.
    Abort,
    /// Try the same medium again.
    Retry,
    /// Accept the medium despite a wrong id.
    IgnoreId,
    /// Eject the medium, optionally switching to another device first.
    Eject {
        /// Device index to switch to.
        device: Option<u32>,
    },
    /// Skip the medium.
    Ignore,
    /// Use a different URL for this medium.
    ChangeUrl(Url),
}

/// Severity level of an RPM install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallLevel {
    /// Plain install.
    Normal,
    /// Retry ignoring dependencies.
    NoDeps,
    /// Retry ignoring dependencies and forcing.
    NoDepsForce,
}

/// Decision on importing and trusting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTrust {
    /// Do not trust the key.
    DontTrust,
    /// Trust for this session only.
    TrustTemporarily,
    /// Trust and import into the trusted key ring.
    TrustAndImport,
}

/// How a remote-vs-local decision is made for a download URL.
///
/// Schemes `cd`, `dvd`, `nfs`, `dir` and `file` are local.
pub fn is_remote_scheme(scheme: &str) -> bool {
    !matches!(
        scheme.to_ascii_lowercase().as_str(),
        "cd" | "dvd" | "nfs" | "dir" | "file"
    )
}
