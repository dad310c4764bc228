//! State shared by all receivers and the host-facing operations.
//!
//! One [`DispatchContext`] lives as long as the bindings. Every field is
//! behind a `Cell`/`RefCell` and no borrow is held across a host call, so
//! receivers and operations may re-enter each other freely.

use crate::callbacks::Callbacks;
use crate::host::{Callback, Host};
use crate::repos::{RepoId, RepoTable};
use crate::throttle::{Throttle, ThrottleConfig};
use pkgbind_schema::EventId;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// Silent-probing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// Normal operation, the user is asked.
    #[default]
    Full,
    /// Repository type detection is running; never prompt.
    Disable,
    /// An optional file is being fetched; missing files are not errors.
    OptionalFile,
}

/// URLs the user substituted for a medium during media-change prompts.
#[derive(Debug, Default)]
pub struct RedirectMemory {
    map: HashMap<String, HashMap<u32, Url>>,
}

impl RedirectMemory {
    pub fn lookup(&self, url: &Url, medium_nr: u32) -> Option<&Url> {
        self.map.get(url.as_str())?.get(&medium_nr)
    }

    pub fn record(&mut self, key: &Url, medium_nr: u32, target: Url) {
        self.map
            .entry(key.as_str().to_string())
            .or_default()
            .insert(medium_nr, target);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub struct DispatchContext {
    host: Rc<dyn Host>,
    callbacks: RefCell<Callbacks>,
    redirects: RefCell<RedirectMemory>,
    probe_mode: Cell<ProbeMode>,
    last_reported: Cell<(RepoId, u32)>,
    repos: RefCell<RepoTable>,
    throttle: ThrottleConfig,
}

impl DispatchContext {
    pub fn new(host: Rc<dyn Host>, throttle: ThrottleConfig) -> Self {
        Self {
            host,
            callbacks: RefCell::new(Callbacks::new()),
            redirects: RefCell::new(RedirectMemory::default()),
            probe_mode: Cell::new(ProbeMode::Full),
            last_reported: Cell::new((-1, 1)),
            repos: RefCell::new(RepoTable::new()),
            throttle,
        }
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Prepare a call of the callback registered for `event`, if any.
    ///
    /// The name is copied out so the registry is not borrowed while the
    /// host runs.
    pub fn callback(&self, event: EventId) -> Option<Callback> {
        let name = self.callbacks.borrow().name_of(event)?.to_string();
        Some(Callback::new(Rc::clone(&self.host), event, name))
    }

    pub fn set_callback(&self, event: EventId, name: &str) {
        self.callbacks.borrow_mut().set(event, name);
    }

    pub fn callbacks(&self) -> Ref<'_, Callbacks> {
        self.callbacks.borrow()
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.throttle)
    }

    pub fn probe_mode(&self) -> ProbeMode {
        self.probe_mode.get()
    }

    pub fn set_probe_mode(&self, mode: ProbeMode) {
        tracing::debug!(?mode, "Silent probing mode");
        self.probe_mode.set(mode);
    }

    /// Enter [`ProbeMode::OptionalFile`] until the guard drops.
    pub fn optional_file_scope(&self) -> ProbeGuard<'_> {
        let previous = self.probe_mode.replace(ProbeMode::OptionalFile);
        ProbeGuard {
            ctx: self,
            previous,
        }
    }

    pub fn redirects(&self) -> RefMut<'_, RedirectMemory> {
        self.redirects.borrow_mut()
    }

    pub fn repos(&self) -> Ref<'_, RepoTable> {
        self.repos.borrow()
    }

    pub fn repos_mut(&self) -> RefMut<'_, RepoTable> {
        self.repos.borrow_mut()
    }

    pub fn log_find_alias(&self, alias: &str) -> RepoId {
        self.repos.borrow().log_find_alias(alias)
    }

    pub fn last_reported(&self) -> (RepoId, u32) {
        self.last_reported.get()
    }

    /// Forget the last reported source so the next item reports again.
    pub fn reset_last_reported(&self) {
        self.last_reported.set((-1, 1));
    }

    /// Tell the host about a change of source medium, once per transition.
    pub fn report_source(&self, repo: RepoId, medium_nr: u32) {
        if self.last_reported.get() == (repo, medium_nr) {
            return;
        }
        self.last_reported.set((repo, medium_nr));
        if let Some(cb) = self.callback(EventId::SourceChange) {
            cb.arg(repo).arg(medium_nr).evaluate();
        }
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("callbacks", &self.callbacks.borrow().len())
            .field("probe_mode", &self.probe_mode.get())
            .field("last_reported", &self.last_reported.get())
            .finish_non_exhaustive()
    }
}

/// Restores the previous probing mode on drop.
#[derive(Debug)]
pub struct ProbeGuard<'a> {
    ctx: &'a DispatchContext,
    previous: ProbeMode,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.ctx.probe_mode.set(self.previous);
    }
}
