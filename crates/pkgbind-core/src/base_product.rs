//! The `baseproduct` link.
//!
//! After a commit `<root>/etc/products.d/baseproduct` points at the `.prod`
//! file of the installed base product, taken from the file list of the
//! product's reference package.

use crate::pool::Pool;
use pkgbind_schema::ResKind;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Location of the link below the target root.
pub fn link_path(target_root: &Path) -> PathBuf {
    target_root.join("etc/products.d/baseproduct")
}

/// File name of the first `/etc/products.d/*.prod` entry in `files`.
pub fn product_file(files: &[String]) -> Option<String> {
    let re = Regex::new(r"^/etc/products\.d/(.*\.prod)$").ok()?;
    files
        .iter()
        .find_map(|f| re.captures(f))
        .map(|caps| caps[1].to_string())
}

/// Name of the reference package of the installed base product, if there
/// is a base product. The inner `None` means it has no reference package.
fn base_reference(pool: &Pool) -> Option<Option<String>> {
    let product = pool
        .by_kind(ResKind::Product)
        .filter_map(|s| s.installed_obj())
        .find(|p| p.resolvable.product().is_some_and(|info| info.category == "base"))?;
    tracing::info!(product = %product.resolvable.name, "Found base product");
    let reference = product
        .resolvable
        .product()
        .map(|info| info.reference_package.clone())
        .filter(|name| !name.is_empty());
    Some(reference)
}

/// Point the link at the base product's `.prod` file.
///
/// Returns `false` when the link could not be created. Having no base
/// product is not an error.
pub fn update_link(target_root: &Path, pool: &Pool) -> bool {
    let Some(reference) = base_reference(pool) else {
        tracing::debug!("No base product installed");
        return true;
    };
    let Some(reference) = reference else {
        tracing::info!("The base product doesn't have any reference package");
        return true;
    };
    let Some(package) = pool
        .get(ResKind::Package, &reference)
        .and_then(|s| s.the_obj())
    else {
        tracing::error!("Reference package {reference} of the base product is not in the pool");
        return false;
    };
    tracing::info!(
        "Found reference package for the base product: {}-{}",
        package.resolvable.name,
        package.resolvable.edition
    );

    let Some(target) = product_file(&package.resolvable.files) else {
        tracing::error!("The product file has not been found");
        return false;
    };
    tracing::info!("Found product file {target}");

    let link = link_path(target_root);
    match std::fs::symlink_metadata(&link) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&link) {
                tracing::error!("Cannot remove base link file {}: {e}", link.display());
                return false;
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("Link {} does not exist", link.display());
        }
        Err(e) => {
            tracing::error!("Cannot stat {}: {e}", link.display());
            return false;
        }
    }

    if let Err(e) = std::os::unix::fs::symlink(&target, &link) {
        tracing::error!("Cannot create symlink {} -> {target}: {e}", link.display());
        return false;
    }
    tracing::info!("Symlink {} -> {target} has been created", link.display());
    true
}
