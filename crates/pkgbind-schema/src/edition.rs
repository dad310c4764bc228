//! Editions (`[epoch:]version[-release]`) and their ordering.

use std::cmp::Ordering;
use std::fmt;

/// Version of a resolvable instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Edition {
    /// Epoch, 0 when absent.
    pub epoch: u32,
    /// Upstream version.
    pub version: String,
    /// Distribution release, may be empty.
    pub release: String,
}

impl Edition {
    /// Build an edition without epoch.
    pub fn new(version: &str, release: &str) -> Self {
        Self {
            epoch: 0,
            version: version.to_string(),
            release: release.to_string(),
        }
    }

    /// `version-release` without the epoch, the form shown to users.
    pub fn version_release(&self) -> String {
        if self.release.is_empty() {
            self.version.clone()
        } else {
            format!("{}-{}", self.version, self.release)
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version_release())
    }
}

impl std::str::FromStr for Edition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) => (
                e.parse::<u32>()
                    .map_err(|_| format!("Invalid epoch in edition: {s}"))?,
                rest,
            ),
            None => (0, s),
        };
        let (version, release) = rest.rsplit_once('-').unwrap_or((rest, ""));
        if version.is_empty() {
            return Err(format!("Empty version in edition: {s}"));
        }
        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.to_string(),
        })
    }
}

impl PartialOrd for Edition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_segments(&self.version, &other.version))
            .then_with(|| compare_segments(&self.release, &other.release))
    }
}

/// Compare two version strings segment by segment.
///
/// Segments are maximal runs of digits or of letters; separators are
/// ignored. Numeric segments compare numerically and sort above
/// alphabetic ones. When all shared segments are equal the string with
/// more segments is newer.
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    let a_parts = segments(a);
    let b_parts = segments(b);

    for (l, r) in a_parts.iter().zip(&b_parts) {
        let l_num = l.bytes().all(|c| c.is_ascii_digit());
        let r_num = r.bytes().all(|c| c.is_ascii_digit());
        let ord = match (l_num, r_num) {
            (true, true) => {
                let l = l.trim_start_matches('0');
                let r = r.trim_start_matches('0');
                l.len().cmp(&r.len()).then_with(|| l.cmp(r))
            }
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a_parts.len().cmp(&b_parts.len())
}

fn segments(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = None;
    let mut digits = false;
    for (i, c) in s.char_indices() {
        let alnum = c.is_ascii_alphanumeric();
        match start {
            Some(st) if !alnum || c.is_ascii_digit() != digits => {
                parts.push(&s[st..i]);
                start = alnum.then_some(i);
            }
            None if alnum => start = Some(i),
            _ => {}
        }
        if alnum {
            digits = c.is_ascii_digit();
        }
    }
    if let Some(st) = start {
        parts.push(&s[st..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ed(s: &str) -> Edition {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_full() {
        let e = ed("2:1.14.3-39.1");
        assert_eq!(e.epoch, 2);
        assert_eq!(e.version, "1.14.3");
        assert_eq!(e.release, "39.1");
        assert_eq!(e.to_string(), "2:1.14.3-39.1");
        assert_eq!(e.version_release(), "1.14.3-39.1");
    }

    #[test]
    fn test_parse_without_release() {
        let e = ed("1.0");
        assert_eq!(e.release, "");
        assert_eq!(e.to_string(), "1.0");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("x:1.0".parse::<Edition>().is_err());
        assert!("".parse::<Edition>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(ed("1.2.3-1") < ed("1.2.4-1"));
        assert!(ed("1.10-1") > ed("1.9-1"));
        assert!(ed("1.0-2") > ed("1.0-1"));
        assert!(ed("1:0.1-1") > ed("9.9-9"));
        assert!(ed("1.0a-1") < ed("1.0.1-1"));
        assert!(ed("1.0.1") > ed("1.0"));
        assert_eq!(ed("1.007-1").cmp(&ed("1.7-1")), Ordering::Equal);
    }
}
