//! Resolvable instances as the engine describes them.

use crate::{Edition, ResKind, SYSTEM_REPO_ALIAS};
use std::fmt;

/// Stable id of one instance inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dependency relation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    /// Capabilities the item provides.
    Provides,
    /// Install-time requirements.
    Prerequires,
    /// Requirements.
    Requires,
    /// Conflicts.
    Conflicts,
    /// Obsoleted capabilities.
    Obsoletes,
    /// Weak forward dependency.
    Recommends,
    /// Weaker forward dependency.
    Suggests,
    /// Freshens.
    Freshens,
    /// Weak reverse dependency.
    Enhances,
    /// Reverse recommends.
    Supplements,
}

impl DepKind {
    /// Key used in host dependency maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provides => "provides",
            Self::Prerequires => "prerequires",
            Self::Requires => "requires",
            Self::Conflicts => "conflicts",
            Self::Obsoletes => "obsoletes",
            Self::Recommends => "recommends",
            Self::Suggests => "suggests",
            Self::Freshens => "freshens",
            Self::Enhances => "enhances",
            Self::Supplements => "supplements",
        }
    }
}

/// One dependency entry of a resolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Relation.
    pub kind: DepKind,
    /// Capability string, e.g. `libzypp >= 17`.
    pub capability: String,
}

/// Patch-specific attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchInfo {
    /// Category, e.g. `security`, `recommended`, `optional`.
    pub category: String,
    /// Needs user interaction (message, license or reboot).
    pub interactive: bool,
    /// Requires a reboot after installation.
    pub reboot_needed: bool,
    /// Updates the package manager stack itself.
    pub affects_pkg_manager: bool,
    /// The patch applies to the installed system.
    pub needed: bool,
}

/// Pattern-specific attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternInfo {
    /// Category shown in group lists.
    pub category: String,
    /// Shown to the user.
    pub visible: bool,
    /// Selected by default.
    pub default: bool,
    /// Icon name.
    pub icon: String,
    /// Install script.
    pub script: String,
    /// Sort key.
    pub order: String,
}

/// Product-specific attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInfo {
    /// `base` or `addon`.
    pub category: String,
    /// Short display name.
    pub short_name: String,
    /// Update repositories announced by the product.
    pub update_urls: Vec<String>,
    /// Free-form product flags.
    pub flags: Vec<String>,
    /// Release notes location.
    pub relnotes_url: String,
    /// Package owning the product's `.prod` file.
    pub reference_package: String,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    /// Binary package.
    Package,
    /// Source package.
    SrcPackage,
    /// Patch.
    Patch(PatchInfo),
    /// Pattern.
    Pattern(PatternInfo),
    /// Product.
    Product(ProductInfo),
}

/// One installed or available instance of a resolvable.
///
/// # Example
///
/// ```
/// use pkgbind_schema::{Edition, ResKind, Resolvable};
///
/// let r = Resolvable::package("zypper", Edition::new("1.14.3", "1.1"))
///     .with_repo("main", 2)
///     .with_sizes(4096, 1024);
/// assert_eq!(r.kind(), ResKind::Package);
/// assert_eq!(r.medium_nr, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolvable {
    /// Name.
    pub name: String,
    /// Edition.
    pub edition: Edition,
    /// Architecture.
    pub arch: String,
    /// Alias of the repository the instance comes from.
    pub repo_alias: String,
    /// Medium number inside the repository, 0 when unknown.
    pub medium_nr: u32,
    /// Size once installed, in bytes.
    pub install_size: u64,
    /// Size of the download, in bytes.
    pub download_size: u64,
    /// One-line summary.
    pub summary: String,
    /// Long description.
    pub description: String,
    /// Vendor.
    pub vendor: String,
    /// License text the user must confirm, empty when none.
    pub license_to_confirm: String,
    /// RPM group.
    pub group: String,
    /// Path of the package file on its medium.
    pub location: String,
    /// Files owned by the instance.
    pub files: Vec<String>,
    /// Dependencies.
    pub dependencies: Vec<Dependency>,
    /// Kind-specific attributes.
    pub details: Details,
}

impl Resolvable {
    /// Build an instance of the given kind with empty metadata.
    pub fn new(name: &str, edition: Edition, details: Details) -> Self {
        Self {
            name: name.to_string(),
            edition,
            arch: "noarch".to_string(),
            repo_alias: String::new(),
            medium_nr: 0,
            install_size: 0,
            download_size: 0,
            summary: String::new(),
            description: String::new(),
            vendor: String::new(),
            license_to_confirm: String::new(),
            group: String::new(),
            location: String::new(),
            files: Vec::new(),
            dependencies: Vec::new(),
            details,
        }
    }

    /// Build a binary package.
    pub fn package(name: &str, edition: Edition) -> Self {
        Self::new(name, edition, Details::Package)
    }

    /// Kind of this instance.
    pub fn kind(&self) -> ResKind {
        match self.details {
            Details::Package => ResKind::Package,
            Details::SrcPackage => ResKind::SrcPackage,
            Details::Patch(_) => ResKind::Patch,
            Details::Pattern(_) => ResKind::Pattern,
            Details::Product(_) => ResKind::Product,
        }
    }

    /// Whether the instance lives in the installed system.
    pub fn is_system(&self) -> bool {
        self.repo_alias == SYSTEM_REPO_ALIAS
    }

    /// Set the architecture.
    pub fn with_arch(mut self, arch: &str) -> Self {
        self.arch = arch.to_string();
        self
    }

    /// Set the repository alias and medium number.
    pub fn with_repo(mut self, alias: &str, medium_nr: u32) -> Self {
        self.repo_alias = alias.to_string();
        self.medium_nr = medium_nr;
        self
    }

    /// Mark as an instance of the installed system.
    pub fn installed(self) -> Self {
        self.with_repo(SYSTEM_REPO_ALIAS, 0)
    }

    /// Set install and download sizes.
    pub fn with_sizes(mut self, install_size: u64, download_size: u64) -> Self {
        self.install_size = install_size;
        self.download_size = download_size;
        self
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    /// Set the owned file list.
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, kind: DepKind, capability: &str) -> Self {
        self.dependencies.push(Dependency {
            kind,
            capability: capability.to_string(),
        });
        self
    }

    /// Set the license the user must confirm.
    pub fn with_license(mut self, license: &str) -> Self {
        self.license_to_confirm = license.to_string();
        self
    }

    /// Capabilities provided by this instance, including its own name.
    pub fn provides(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(
            self.dependencies
                .iter()
                .filter(|d| d.kind == DepKind::Provides)
                .map(|d| capability_name(&d.capability)),
        )
    }

    /// Patch attributes, when this is a patch.
    pub fn patch(&self) -> Option<&PatchInfo> {
        match &self.details {
            Details::Patch(info) => Some(info),
            _ => None,
        }
    }

    /// Product attributes, when this is a product.
    pub fn product(&self) -> Option<&ProductInfo> {
        match &self.details {
            Details::Product(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}.{}", self.kind(), self.name, self.edition, self.arch)
    }
}

/// Name part of a capability string (`foo >= 1.0` yields `foo`).
pub fn capability_name(capability: &str) -> &str {
    capability.split_whitespace().next().unwrap_or(capability)
}
