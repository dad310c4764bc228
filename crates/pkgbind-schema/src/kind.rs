//! Resolvable kinds.

use std::fmt;

/// Kind of a resolvable, as the host names it with a symbol.
///
/// # Example
///
/// ```
/// use pkgbind_schema::ResKind;
///
/// let kind: ResKind = "srcpackage".parse().unwrap();
/// assert_eq!(kind, ResKind::SrcPackage);
/// assert_eq!(kind.as_str(), "srcpackage");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResKind {
    /// Binary package.
    Package,
    /// Patch (errata).
    Patch,
    /// Pattern (package group).
    Pattern,
    /// Product.
    Product,
    /// Source package.
    SrcPackage,
}

impl ResKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResKind; 5] = [
        Self::Package,
        Self::Patch,
        Self::Pattern,
        Self::Product,
        Self::SrcPackage,
    ];

    /// Symbol name used by the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Patch => "patch",
            Self::Pattern => "pattern",
            Self::Product => "product",
            Self::SrcPackage => "srcpackage",
        }
    }
}

impl fmt::Display for ResKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(Self::Package),
            "patch" => Ok(Self::Patch),
            "pattern" => Ok(Self::Pattern),
            "product" => Ok(Self::Product),
            "srcpackage" => Ok(Self::SrcPackage),
            _ => Err(format!("Unknown resolvable kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_kinds() {
        for kind in ResKind::ALL {
            assert_eq!(kind.as_str().parse::<ResKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_obsolete_selection_is_unknown() {
        assert!("selection".parse::<ResKind>().is_err());
    }
}
