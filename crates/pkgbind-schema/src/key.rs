//! Public keys handled by the engine's key ring.

/// A GPG public key as reported by the key ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKey {
    /// Short key id.
    pub id: String,
    /// User id.
    pub name: String,
    /// Full fingerprint.
    pub fingerprint: String,
    /// Creation time as a Unix timestamp.
    pub created: Option<i64>,
    /// Expiry time as a Unix timestamp, `None` if the key never expires.
    pub expires: Option<i64>,
    /// File the key was read from.
    pub path: String,
}

impl PublicKey {
    /// Whether the key is expired at `now` (Unix timestamp).
    pub fn expired_at(&self, now: i64) -> bool {
        self.expires.is_some_and(|e| e <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let key = PublicKey {
            expires: Some(100),
            ..Default::default()
        };
        assert!(key.expired_at(100));
        assert!(!key.expired_at(99));
        assert!(!PublicKey::default().expired_at(i64::MAX));
    }
}
