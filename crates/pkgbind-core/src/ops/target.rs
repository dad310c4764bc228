//! Target database and optional file operations.

use super::PkgBindings;
use crate::error::BridgeError;
use crate::repos::RepoInfo;
use pkgbind_schema::Value;
use std::path::Path;

impl PkgBindings {
    pub(super) fn get_backup_path(&self) -> Value {
        self.engine.backup_path().display().to_string().into()
    }

    pub(super) fn set_backup_path(&self, path: &str) -> Value {
        tracing::info!("Setting backup path to {path}");
        self.engine.set_backup_path(Path::new(path));
        Value::Void
    }

    pub(super) fn create_backups(&self, enabled: bool) -> Value {
        tracing::info!(enabled, "Package backups");
        self.engine.create_backups(enabled);
        Value::Void
    }

    pub(super) fn rpm_checksig(&self, path: &str) -> bool {
        let ok = self.engine.check_signature(Path::new(path));
        tracing::info!("Checking signature of {path}: {ok}");
        ok
    }

    fn repo_info(&self, id: i64) -> Option<RepoInfo> {
        let repos = self.ctx.repos();
        match repos.get(id) {
            Some(entry) if !entry.deleted => Some(entry.info.clone()),
            _ => None,
        }
    }

    /// Fetch a file that may be missing from the medium. Media prompts stay
    /// quiet while it runs; a missing file yields void.
    pub(super) fn provide_optional_file(
        &self,
        repo: i64,
        medium: i64,
        path: &str,
    ) -> Result<Value, BridgeError> {
        let medium_nr = u32::try_from(medium).map_err(|_| BridgeError::BadArgument {
            op: "SourceProvideOptionalFile".to_string(),
            index: 1,
            expected: "a non-negative medium number",
            got: medium.to_string(),
        })?;
        let Some(info) = self.repo_info(repo) else {
            tracing::error!("Repository {repo} not found");
            return Ok(Value::Void);
        };

        let _quiet = self.ctx.optional_file_scope();
        match self.engine.provide_file(&info, medium_nr, Path::new(path)) {
            Ok(local) => {
                tracing::info!("Provided {path} from {} as {}", info.alias, local.display());
                Ok(local.display().to_string().into())
            }
            Err(e) => {
                tracing::info!("Optional file {path} not provided: {e}");
                Ok(Value::Void)
            }
        }
    }
}
