//! Patch scripts and patch messages.

use crate::context::DispatchContext;
use crate::report::{PatchMessageReport, PatchScriptReport, ScriptNotify};
use pkgbind_schema::{EventId, ProblemAction, Resolvable};
use std::path::Path;
use std::rc::Rc;

pub struct PatchScriptReceiver {
    ctx: Rc<DispatchContext>,
}

impl PatchScriptReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl PatchScriptReport for PatchScriptReceiver {
    fn start(&self, package: &Resolvable, script: &Path) {
        if let Some(cb) = self.ctx.callback(EventId::ScriptStart) {
            cb.arg(package.name.as_str())
                .arg(package.edition.to_string())
                .arg(package.arch.as_str())
                .arg(script.to_string_lossy().as_ref())
                .evaluate();
        }
    }

    fn progress(&self, notify: ScriptNotify, output: &str) -> bool {
        match self.ctx.callback(EventId::ScriptProgress) {
            // false aborts the script
            Some(cb) => cb
                .arg(notify == ScriptNotify::Ping)
                .arg(output)
                .evaluate_bool()
                .unwrap_or(true),
            None => true,
        }
    }

    fn problem(&self, description: &str) -> ProblemAction {
        let Some(cb) = self.ctx.callback(EventId::ScriptProblem) else {
            return ProblemAction::Abort;
        };
        match cb.arg(description).evaluate_str().as_deref() {
            Some("A") => ProblemAction::Abort,
            Some("I") => ProblemAction::Ignore,
            Some("R") => ProblemAction::Retry,
            Some(other) => {
                tracing::error!("Unknown ScriptProblem reply: {other:?}");
                ProblemAction::Abort
            }
            None => ProblemAction::Abort,
        }
    }

    fn finish(&self) {
        if let Some(cb) = self.ctx.callback(EventId::ScriptFinish) {
            cb.evaluate();
        }
    }
}

pub struct PatchMessageReceiver {
    ctx: Rc<DispatchContext>,
}

impl PatchMessageReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl PatchMessageReport for PatchMessageReceiver {
    fn show(&self, patch: &Resolvable, message: &str) -> bool {
        match self.ctx.callback(EventId::Message) {
            Some(cb) => cb
                .arg(patch.name.as_str())
                .arg(patch.edition.to_string())
                .arg(patch.arch.as_str())
                .arg(message)
                .evaluate_bool()
                .unwrap_or(true),
            None => true,
        }
    }
}
