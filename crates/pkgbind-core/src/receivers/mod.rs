//! Engine report receivers.
//!
//! One receiver per event class. Each translates engine events into calls of
//! the host callback registered for them and maps the host's reply back to
//! the action the engine expects. Without a registered callback a receiver
//! gives the engine its own default.

mod download;
mod media;
mod package;
mod provide;
mod repo;
mod rpmdb;
mod script;
mod trust;

pub use download::DownloadProgressReceiver;
pub use media::{MediaChangeReceiver, parse_media_reply};
pub use package::{InstallReceiver, RemoveReceiver};
pub(crate) use package::file_name;
pub use provide::DownloadResolvableReceiver;
pub use repo::{ProbeRepoReceiver, RepoCreateReceiver, RepoReceiver, parse_repo_symbol};
pub use rpmdb::{ConvertDbReceiver, RebuildDbReceiver};
pub use script::{PatchMessageReceiver, PatchScriptReceiver};
pub use trust::{DigestReceiver, KeyRingReceiver, KeyRingSignalReceiver, key_map};

use crate::context::DispatchContext;
use crate::report::{ReportHub, Subscription};
use pkgbind_schema::ProblemAction;
use std::rc::Rc;

/// Decode a `Done*` reply: `"R"` retries, `"C"` cancels, anything else
/// skips the item.
pub fn done_reply(reply: &str) -> ProblemAction {
    match reply {
        "R" => ProblemAction::Retry,
        "C" => ProblemAction::Abort,
        _ => ProblemAction::Ignore,
    }
}

/// Every receiver, connected to a [`ReportHub`] for as long as this value
/// lives.
#[derive(Debug)]
pub struct Receivers {
    subscriptions: Vec<Subscription>,
}

impl Receivers {
    pub fn connect(hub: &Rc<ReportHub>, ctx: &Rc<DispatchContext>) -> Self {
        let subscriptions = vec![
            hub.connect_install(Rc::new(InstallReceiver::new(Rc::clone(ctx)))),
            hub.connect_remove(Rc::new(RemoveReceiver::new(Rc::clone(ctx)))),
            hub.connect_download_resolvable(Rc::new(DownloadResolvableReceiver::new(Rc::clone(
                ctx,
            )))),
            hub.connect_download_progress(Rc::new(DownloadProgressReceiver::new(Rc::clone(ctx)))),
            hub.connect_media_change(Rc::new(MediaChangeReceiver::new(Rc::clone(ctx)))),
            hub.connect_repo_create(Rc::new(RepoCreateReceiver::new(Rc::clone(ctx)))),
            hub.connect_probe_repo(Rc::new(ProbeRepoReceiver::new(Rc::clone(ctx)))),
            hub.connect_repo(Rc::new(RepoReceiver::new(Rc::clone(ctx)))),
            hub.connect_patch_script(Rc::new(PatchScriptReceiver::new(Rc::clone(ctx)))),
            hub.connect_patch_message(Rc::new(PatchMessageReceiver::new(Rc::clone(ctx)))),
            hub.connect_digest(Rc::new(DigestReceiver::new(Rc::clone(ctx)))),
            hub.connect_key_ring(Rc::new(KeyRingReceiver::new(Rc::clone(ctx)))),
            hub.connect_key_ring_signals(Rc::new(KeyRingSignalReceiver::new(Rc::clone(ctx)))),
            hub.connect_convert_db(Rc::new(ConvertDbReceiver::new(Rc::clone(ctx)))),
            hub.connect_rebuild_db(Rc::new(RebuildDbReceiver::new(Rc::clone(ctx)))),
        ];
        tracing::debug!(count = subscriptions.len(), "Connected report receivers");
        Self { subscriptions }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
