//! Engine-side report interfaces.
//!
//! The engine emits its progress and decision events through a
//! [`ReportHub`]. Each event class is one trait; the default method bodies
//! are the engine's own default actions, used whenever no receiver is
//! connected or a receiver cannot decide.

use crate::repos::RepoInfo;
use pkgbind_schema::{
    InstallLevel, KeyTrust, MediaAction, ProblemAction, PublicKey, ReportError, Resolvable,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};
use url::Url;

/// RPM install of one package.
pub trait InstallReport {
    fn start(&self, _resolvable: &Resolvable) {}

    fn progress(&self, _value: i32, _resolvable: &Resolvable) -> bool {
        true
    }

    fn problem(
        &self,
        _resolvable: &Resolvable,
        _error: ReportError,
        _description: &str,
        _level: InstallLevel,
    ) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(
        &self,
        _resolvable: &Resolvable,
        _error: ReportError,
        _reason: &str,
        _level: InstallLevel,
    ) {
    }
}

/// RPM removal of one package.
pub trait RemoveReport {
    fn start(&self, _resolvable: &Resolvable) {}

    fn progress(&self, _value: i32, _resolvable: &Resolvable) -> bool {
        true
    }

    fn problem(
        &self,
        _resolvable: &Resolvable,
        _error: ReportError,
        _description: &str,
    ) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self, _resolvable: &Resolvable, _error: ReportError, _reason: &str) {}
}

/// Fetching a resolvable from its repository, including delta and patch
/// RPMs. Delta and patch problems are informational.
pub trait DownloadResolvableReport {
    fn start(&self, _resolvable: &Resolvable, _url: &Url) {}

    fn progress(&self, _value: i32, _resolvable: &Resolvable) -> bool {
        true
    }

    fn problem(
        &self,
        _resolvable: &Resolvable,
        _error: ReportError,
        _description: &str,
    ) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self, _resolvable: &Resolvable, _error: ReportError, _reason: &str) {}

    fn start_delta_download(&self, _file: &Path, _download_size: u64) {}

    fn progress_delta_download(&self, _value: i32) -> bool {
        true
    }

    fn problem_delta_download(&self, _description: &str) {}

    fn finish_delta_download(&self) {}

    fn start_delta_apply(&self, _file: &Path) {}

    fn progress_delta_apply(&self, _value: i32) {}

    fn problem_delta_apply(&self, _description: &str) {}

    fn finish_delta_apply(&self) {}

    fn start_patch_download(&self, _file: &Path, _download_size: u64) {}

    fn progress_patch_download(&self, _value: i32) -> bool {
        true
    }

    fn problem_patch_download(&self, _description: &str) {}

    fn finish_patch_download(&self) {}
}

/// Raw file transfer from a medium.
pub trait DownloadProgressReport {
    fn start(&self, _file: &Url, _local: &Path) {}

    fn progress(&self, _value: i32, _file: &Url, _bps_avg: f64, _bps_current: f64) -> bool {
        true
    }

    fn problem(&self, _file: &Url, _error: ReportError, _description: &str) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self, _file: &Url, _error: ReportError, _reason: &str) {}
}

/// Inputs of a media-change request.
#[derive(Debug, Clone)]
pub struct MediaRequest<'a> {
    pub url: &'a Url,
    pub medium_nr: u32,
    /// Label of the medium, usually the repository alias.
    pub label: &'a str,
    pub error: ReportError,
    pub description: &'a str,
    pub devices: &'a [String],
    pub current_device: u32,
}

/// The engine needs a different medium.
pub trait MediaChangeReport {
    fn request_media(&self, _request: &MediaRequest<'_>) -> MediaAction {
        MediaAction::Abort
    }
}

/// Adding a repository.
pub trait RepoCreateReport {
    fn report_begin(&self) {}

    fn report_end(&self) {}

    fn start(&self, _url: &Url) {}

    fn progress(&self, _value: i32) -> bool {
        true
    }

    fn problem(&self, _url: &Url, _error: ReportError, _description: &str) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self, _url: &Url, _error: ReportError, _reason: &str) {}
}

/// Detecting the type of a repository.
pub trait ProbeRepoReport {
    fn start(&self, _url: &Url) {}

    fn failed_probe(&self, _url: &Url, _type_name: &str) {}

    fn success_probe(&self, _url: &Url, _type_name: &str) {}

    fn finish(&self, _url: &Url, _error: ReportError, _reason: &str) {}

    fn progress(&self, _url: &Url, _value: i32) -> bool {
        true
    }

    fn problem(&self, _url: &Url, _error: ReportError, _description: &str) -> ProblemAction {
        ProblemAction::Abort
    }
}

/// Refreshing or loading a known repository.
pub trait RepoReport {
    fn report_begin(&self) {}

    fn report_end(&self) {}

    fn start(&self, _task: &str, _repo: &RepoInfo) {}

    fn progress(&self, _value: i32) -> bool {
        true
    }

    fn problem(&self, _repo: &RepoInfo, _error: ReportError, _description: &str) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self, _repo: &RepoInfo, _task: &str, _error: ReportError, _reason: &str) {}
}

/// Kind of a script progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptNotify {
    /// Still alive, no output.
    Ping,
    /// New output.
    Output,
}

/// Running a patch script.
pub trait PatchScriptReport {
    fn start(&self, _package: &Resolvable, _script: &Path) {}

    fn progress(&self, _notify: ScriptNotify, _output: &str) -> bool {
        true
    }

    fn problem(&self, _description: &str) -> ProblemAction {
        ProblemAction::Abort
    }

    fn finish(&self) {}
}

/// Showing a patch message.
pub trait PatchMessageReport {
    fn show(&self, _patch: &Resolvable, _message: &str) -> bool {
        true
    }
}

/// Checksum verification of downloaded files.
pub trait DigestReport {
    fn accept_no_digest(&self, _file: &Path) -> bool {
        false
    }

    fn accept_unknown_digest(&self, _file: &Path, _name: &str) -> bool {
        false
    }

    fn accept_wrong_digest(&self, _file: &Path, _requested: &str, _found: &str) -> bool {
        false
    }
}

/// Repository a signature check happens for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyContext {
    pub repo_alias: String,
}

/// Signature verification decisions.
pub trait KeyRingReport {
    fn accept_key(&self, _key: &PublicKey, _context: &KeyContext) -> KeyTrust {
        KeyTrust::DontTrust
    }

    fn accept_unsigned_file(&self, _file: &str, _context: &KeyContext) -> bool {
        false
    }

    fn accept_unknown_key(&self, _file: &str, _id: &str, _context: &KeyContext) -> bool {
        false
    }

    fn accept_non_trusted_key(&self, _file: &str, _key: &PublicKey, _context: &KeyContext) -> bool {
        false
    }

    fn accept_verification_failed(
        &self,
        _file: &str,
        _key: &PublicKey,
        _context: &KeyContext,
    ) -> bool {
        false
    }
}

/// Changes of the trusted key ring.
pub trait KeyRingSignals {
    fn trusted_key_added(&self, _key: &PublicKey) {}

    fn trusted_key_removed(&self, _key: &PublicKey) {}
}

/// Converting the RPM database to a new format.
pub trait ConvertDbReport {
    fn start(&self, _path: &Path) {}

    fn progress(&self, _value: i32, _path: &Path) -> bool {
        true
    }

    fn finish(&self, _path: &Path, _error: ReportError, _reason: &str) {}
}

/// Rebuilding the RPM database.
pub trait RebuildDbReport {
    fn start(&self, _path: &Path) {}

    fn progress(&self, _value: i32, _path: &Path) -> bool {
        true
    }

    fn finish(&self, _path: &Path, _error: ReportError, _reason: &str) {}
}

/// Receiver used when nothing is connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineDefaults;

impl InstallReport for EngineDefaults {}
impl RemoveReport for EngineDefaults {}
impl DownloadResolvableReport for EngineDefaults {}
impl DownloadProgressReport for EngineDefaults {}
impl MediaChangeReport for EngineDefaults {}
impl RepoCreateReport for EngineDefaults {}
impl ProbeRepoReport for EngineDefaults {}
impl RepoReport for EngineDefaults {}
impl PatchScriptReport for EngineDefaults {}
impl PatchMessageReport for EngineDefaults {}
impl DigestReport for EngineDefaults {}
impl KeyRingReport for EngineDefaults {}
impl KeyRingSignals for EngineDefaults {}
impl ConvertDbReport for EngineDefaults {}
impl RebuildDbReport for EngineDefaults {}

/// Disconnects a receiver from its [`ReportHub`] slot when dropped.
///
/// If a newer receiver replaced it in the meantime the slot is left alone.
#[must_use = "dropping the subscription disconnects the receiver"]
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

macro_rules! report_hub {
    ($($slot:ident: $report:ident => $connect:ident,)+) => {
        /// Connection point between engine report emitters and receivers.
        ///
        /// One slot per event class. The engine fetches the current receiver
        /// of a slot each time it emits.
        #[derive(Default)]
        pub struct ReportHub {
            next_token: Cell<u64>,
            $($slot: RefCell<Option<(u64, Rc<dyn $report>)>>,)+
        }

        impl ReportHub {
            pub fn new() -> Rc<Self> {
                Rc::new(Self::default())
            }

            fn token(&self) -> u64 {
                let token = self.next_token.get() + 1;
                self.next_token.set(token);
                token
            }

            $(
                pub fn $connect(self: &Rc<Self>, receiver: Rc<dyn $report>) -> Subscription {
                    let token = self.token();
                    *self.$slot.borrow_mut() = Some((token, receiver));
                    let hub: Weak<Self> = Rc::downgrade(self);
                    Subscription::new(move || {
                        if let Some(hub) = hub.upgrade() {
                            let mut slot = hub.$slot.borrow_mut();
                            if slot.as_ref().is_some_and(|(t, _)| *t == token) {
                                *slot = None;
                            }
                        }
                    })
                }

                pub fn $slot(&self) -> Rc<dyn $report> {
                    match self.$slot.borrow().as_ref() {
                        Some((_, receiver)) => Rc::clone(receiver),
                        None => Rc::new(EngineDefaults),
                    }
                }
            )+

            /// Number of connected slots.
            pub fn connected(&self) -> usize {
                let mut n = 0;
                $(n += usize::from(self.$slot.borrow().is_some());)+
                n
            }
        }
    };
}

report_hub! {
    install: InstallReport => connect_install,
    remove: RemoveReport => connect_remove,
    download_resolvable: DownloadResolvableReport => connect_download_resolvable,
    download_progress: DownloadProgressReport => connect_download_progress,
    media_change: MediaChangeReport => connect_media_change,
    repo_create: RepoCreateReport => connect_repo_create,
    probe_repo: ProbeRepoReport => connect_probe_repo,
    repo: RepoReport => connect_repo,
    patch_script: PatchScriptReport => connect_patch_script,
    patch_message: PatchMessageReport => connect_patch_message,
    digest: DigestReport => connect_digest,
    key_ring: KeyRingReport => connect_key_ring,
    key_ring_signals: KeyRingSignals => connect_key_ring_signals,
    convert_db: ConvertDbReport => connect_convert_db,
    rebuild_db: RebuildDbReport => connect_rebuild_db,
}

impl std::fmt::Debug for ReportHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportHub")
            .field("connected", &self.connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysRetry;

    impl MediaChangeReport for AlwaysRetry {
        fn request_media(&self, _request: &MediaRequest<'_>) -> MediaAction {
            MediaAction::Retry
        }
    }

    fn request(url: &Url) -> MediaRequest<'_> {
        MediaRequest {
            url,
            medium_nr: 1,
            label: "dvd",
            error: ReportError::NotFound,
            description: "",
            devices: &[],
            current_device: 0,
        }
    }

    #[test]
    fn test_default_when_disconnected() {
        let hub = ReportHub::new();
        let url = Url::parse("cd:///").unwrap();
        assert_eq!(hub.media_change().request_media(&request(&url)), MediaAction::Abort);
        assert!(hub.download_progress().progress(10, &url, 0.0, 0.0));
    }

    #[test]
    fn test_subscription_disconnects_on_drop() {
        let hub = ReportHub::new();
        let url = Url::parse("cd:///").unwrap();
        {
            let _sub = hub.connect_media_change(Rc::new(AlwaysRetry));
            assert_eq!(hub.connected(), 1);
            assert_eq!(hub.media_change().request_media(&request(&url)), MediaAction::Retry);
        }
        assert_eq!(hub.connected(), 0);
        assert_eq!(hub.media_change().request_media(&request(&url)), MediaAction::Abort);
    }

    #[test]
    fn test_stale_subscription_keeps_newer_receiver() {
        let hub = ReportHub::new();
        let first = hub.connect_media_change(Rc::new(AlwaysRetry));
        let _second = hub.connect_media_change(Rc::new(AlwaysRetry));
        drop(first);
        assert_eq!(hub.connected(), 1);
    }
}
