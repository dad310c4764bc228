//! Bindings configuration.
//!
//! Read from a TOML file. Every key is optional:
//!
//! ```toml
//! target_root = "/"
//! log_dir = "/var/log/pkgbind"
//! problem_list = "badlist"
//!
//! [throttle]
//! min_delta = 5
//! interval_ms = 3000
//! ```

use crate::throttle::ThrottleConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory for the problem list: `PKGBIND_LOG_DIR`, else the user state
/// directory, else `/var/log/pkgbind`.
pub fn default_log_dir() -> PathBuf {
    if let Ok(val) = std::env::var("PKGBIND_LOG_DIR") {
        return PathBuf::from(val);
    }
    dirs::state_dir()
        .map(|d| d.join("pkgbind"))
        .unwrap_or_else(|| PathBuf::from("/var/log/pkgbind"))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Root of the system being installed.
    pub target_root: PathBuf,
    pub log_dir: PathBuf,
    /// File name of the solver problem list inside `log_dir`.
    pub problem_list: String,
    pub throttle: ThrottleConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            target_root: PathBuf::from("/"),
            log_dir: default_log_dir(),
            problem_list: "badlist".to_string(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load the file named by `PKGBIND_CONFIG`, or the defaults when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the named file cannot be loaded.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os("PKGBIND_CONFIG") {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Where the solver problem list goes.
    pub fn problem_list_path(&self) -> PathBuf {
        self.log_dir.join(&self.problem_list)
    }
}
