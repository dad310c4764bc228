//! Checksum and signature decisions.

use crate::context::DispatchContext;
use crate::report::{DigestReport, KeyContext, KeyRingReport, KeyRingSignals};
use chrono::DateTime;
use pkgbind_schema::{EventId, KeyTrust, PublicKey, Value};
use std::path::Path;
use std::rc::Rc;

fn format_date(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// A key as the host sees it.
pub fn key_map(key: &PublicKey) -> Value {
    let now = chrono::Utc::now().timestamp();
    Value::map([
        ("id", Value::from(key.id.as_str())),
        ("name", Value::from(key.name.as_str())),
        ("fingerprint", Value::from(key.fingerprint.as_str())),
        ("created", Value::from(format_date(key.created))),
        ("expires", Value::from(format_date(key.expires))),
        ("expired", Value::from(key.expired_at(now))),
        ("path", Value::from(key.path.as_str())),
    ])
}

pub struct DigestReceiver {
    ctx: Rc<DispatchContext>,
}

impl DigestReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl DigestReport for DigestReceiver {
    fn accept_no_digest(&self, file: &Path) -> bool {
        match self.ctx.callback(EventId::AcceptFileWithoutChecksum) {
            Some(cb) => cb
                .arg(file.to_string_lossy().as_ref())
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }

    fn accept_unknown_digest(&self, file: &Path, name: &str) -> bool {
        match self.ctx.callback(EventId::AcceptUnknownDigest) {
            Some(cb) => cb
                .arg(file.to_string_lossy().as_ref())
                .arg(name)
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }

    fn accept_wrong_digest(&self, file: &Path, requested: &str, found: &str) -> bool {
        match self.ctx.callback(EventId::AcceptWrongDigest) {
            Some(cb) => cb
                .arg(file.to_string_lossy().as_ref())
                .arg(requested)
                .arg(found)
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }
}

pub struct KeyRingReceiver {
    ctx: Rc<DispatchContext>,
}

impl KeyRingReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl KeyRingReport for KeyRingReceiver {
    fn accept_key(&self, key: &PublicKey, context: &KeyContext) -> KeyTrust {
        let Some(cb) = self.ctx.callback(EventId::ImportGpgKey) else {
            tracing::info!("ImportGpgKey callback not registered, not trusting key {}", key.id);
            return KeyTrust::DontTrust;
        };
        let repo = self.ctx.log_find_alias(&context.repo_alias);
        let Some(accept) = cb.arg(key_map(key)).arg(repo).evaluate_bool() else {
            return KeyTrust::DontTrust;
        };
        tracing::info!(key = %key.id, "ImportGpgKey returned {accept}");
        if accept {
            KeyTrust::TrustAndImport
        } else {
            KeyTrust::DontTrust
        }
    }

    fn accept_unsigned_file(&self, file: &str, context: &KeyContext) -> bool {
        match self.ctx.callback(EventId::AcceptUnsignedFile) {
            Some(cb) => cb
                .arg(file)
                .arg(self.ctx.log_find_alias(&context.repo_alias))
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }

    fn accept_unknown_key(&self, file: &str, id: &str, context: &KeyContext) -> bool {
        let Some(cb) = self.ctx.callback(EventId::AcceptUnknownGpgKey) else {
            return false;
        };
        let accept = cb
            .arg(file)
            .arg(id)
            .arg(self.ctx.log_find_alias(&context.repo_alias))
            .evaluate_bool()
            .unwrap_or(false);
        tracing::info!(key = id, "AcceptUnknownGpgKey returned {accept}");
        accept
    }

    fn accept_non_trusted_key(&self, file: &str, key: &PublicKey, _context: &KeyContext) -> bool {
        match self.ctx.callback(EventId::AcceptNonTrustedGpgKey) {
            Some(cb) => cb
                .arg(file)
                .arg(key.id.as_str())
                .arg(key.name.as_str())
                .arg(key.fingerprint.as_str())
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }

    fn accept_verification_failed(
        &self,
        file: &str,
        key: &PublicKey,
        context: &KeyContext,
    ) -> bool {
        match self.ctx.callback(EventId::AcceptVerificationFailed) {
            Some(cb) => cb
                .arg(file)
                .arg(key_map(key))
                .arg(self.ctx.log_find_alias(&context.repo_alias))
                .evaluate_bool()
                .unwrap_or(false),
            None => false,
        }
    }
}

pub struct KeyRingSignalReceiver {
    ctx: Rc<DispatchContext>,
}

impl KeyRingSignalReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl KeyRingSignals for KeyRingSignalReceiver {
    fn trusted_key_added(&self, key: &PublicKey) {
        if let Some(cb) = self.ctx.callback(EventId::TrustedKeyAdded) {
            cb.arg(key_map(key)).evaluate();
        }
    }

    fn trusted_key_removed(&self, key: &PublicKey) {
        if let Some(cb) = self.ctx.callback(EventId::TrustedKeyRemoved) {
            cb.arg(key_map(key)).evaluate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::RepoInfo;
    use crate::testing::RecordingHost;
    use crate::throttle::ThrottleConfig;
    use url::Url;

    fn setup() -> (Rc<RecordingHost>, Rc<DispatchContext>) {
        let host = Rc::new(RecordingHost::new());
        let ctx = Rc::new(DispatchContext::new(host.clone(), ThrottleConfig::default()));
        let url = Url::parse("http://download.example.com/update").unwrap();
        ctx.repos_mut().add(RepoInfo::new("update", url));
        (host, ctx)
    }

    fn key() -> PublicKey {
        PublicKey {
            id: "A29D4C0A".into(),
            name: "Build Service <build@example.com>".into(),
            fingerprint: "0123456789ABCDEF".into(),
            created: Some(1_700_000_000),
            expires: None,
            path: "/tmp/key.asc".into(),
        }
    }

    #[test]
    fn test_key_map_fields() {
        let map = key_map(&key());
        assert_eq!(map.get("id"), Some(&Value::from("A29D4C0A")));
        assert_eq!(map.get("created"), Some(&Value::from("2023-11-14")));
        assert_eq!(map.get("expires"), Some(&Value::from("")));
        assert_eq!(map.get("expired"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_accept_key_maps_boolean() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::ImportGpgKey, "Import");
        let rx = KeyRingReceiver::new(ctx);
        let context = KeyContext {
            repo_alias: "update".into(),
        };
        host.reply("Import", Value::Bool(true));
        assert_eq!(rx.accept_key(&key(), &context), KeyTrust::TrustAndImport);
        host.reply("Import", Value::Bool(false));
        assert_eq!(rx.accept_key(&key(), &context), KeyTrust::DontTrust);
        assert_eq!(host.calls_to("Import")[0][1], Value::Integer(0));
    }

    #[test]
    fn test_defaults_without_callbacks() {
        let (_host, ctx) = setup();
        let digest = DigestReceiver::new(ctx.clone());
        assert!(!digest.accept_no_digest(Path::new("repomd.xml")));
        let ring = KeyRingReceiver::new(ctx);
        assert_eq!(
            ring.accept_key(&key(), &KeyContext::default()),
            KeyTrust::DontTrust
        );
        assert!(!ring.accept_unsigned_file("repomd.xml", &KeyContext::default()));
    }

    #[test]
    fn test_non_trusted_key_arguments() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::AcceptNonTrustedGpgKey, "NonTrusted");
        host.reply("NonTrusted", Value::Bool(true));
        let rx = KeyRingReceiver::new(ctx);
        assert!(rx.accept_non_trusted_key("repomd.xml", &key(), &KeyContext::default()));
        assert_eq!(
            host.calls_to("NonTrusted")[0],
            vec![
                Value::from("repomd.xml"),
                Value::from("A29D4C0A"),
                Value::from("Build Service <build@example.com>"),
                Value::from("0123456789ABCDEF"),
            ]
        );
    }

    #[test]
    fn test_trusted_key_signal() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::TrustedKeyAdded, "Added");
        KeyRingSignalReceiver::new(ctx).trusted_key_added(&key());
        assert_eq!(host.calls_to("Added")[0][0].get("path"), Some(&Value::from("/tmp/key.asc")));
    }
}
