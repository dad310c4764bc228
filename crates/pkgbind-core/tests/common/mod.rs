#![allow(dead_code)]

use pkgbind_core::testing::{MemoryEngine, RecordingHost};
use pkgbind_core::{BridgeConfig, PkgBindings, RepoInfo};
use pkgbind_schema::{Edition, Resolvable, Value};
use std::rc::Rc;
use tempfile::TempDir;
use url::Url;

/// Bindings over an in-memory engine with a small pool:
///
/// - `vim` 9.0 installed, 9.1 available on `oss` medium 1
/// - `zypper` available on `oss` medium 1
/// - `foo` available on `oss` medium 2
/// - `nano` installed, no longer available
pub struct TestContext {
    pub temp_dir: TempDir,
    pub host: Rc<RecordingHost>,
    pub engine: Rc<MemoryEngine>,
    pub bindings: Rc<PkgBindings>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_host(Rc::new(RecordingHost::new()))
    }

    pub fn with_host(host: Rc<RecordingHost>) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = BridgeConfig {
            target_root: temp_dir.path().join("root"),
            log_dir: temp_dir.path().join("log"),
            ..BridgeConfig::default()
        };
        let engine = Rc::new(MemoryEngine::new());
        let bindings = Rc::new(PkgBindings::new(host.clone(), engine.clone(), config));
        bindings.add_repo(RepoInfo::new(
            "oss",
            Url::parse("http://download.example.org/oss").expect("valid url"),
        ));

        {
            let mut pool = bindings.pool_mut();
            pool.add(Resolvable::package("vim", Edition::new("9.0", "1")).installed());
            pool.add(Resolvable::package("vim", Edition::new("9.1", "1")).with_repo("oss", 1));
            pool.add(Resolvable::package("zypper", Edition::new("1.14", "2")).with_repo("oss", 1));
            pool.add(Resolvable::package("foo", Edition::new("1.0", "1")).with_repo("oss", 2));
            pool.add(Resolvable::package("nano", Edition::new("7.2", "1")).installed());
        }

        Self {
            temp_dir,
            host,
            engine,
            bindings,
        }
    }

    /// Invoke an operation that must not fail.
    pub fn call(&self, op: &str, args: &[Value]) -> Value {
        self.bindings
            .call(op, args)
            .unwrap_or_else(|e| panic!("{op} failed: {e}"))
    }

    pub fn register(&self, callback: &str, function: &str) {
        self.call(callback, &[function.into()]);
    }
}
