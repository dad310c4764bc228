//! RPM install and removal receivers.

use super::done_reply;
use crate::context::DispatchContext;
use crate::report::{InstallReport, RemoveReport};
use crate::throttle::Throttle;
use pkgbind_schema::{EventId, InstallLevel, ProblemAction, ReportError, Resolvable};
use std::cell::RefCell;
use std::rc::Rc;

/// File name part of a package location.
pub(crate) fn file_name(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or(location)
}

pub struct InstallReceiver {
    ctx: Rc<DispatchContext>,
    throttle: Throttle,
    /// Package currently reported as started.
    last: RefCell<Option<Resolvable>>,
}

impl InstallReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        let throttle = ctx.throttle();
        Self {
            ctx,
            throttle,
            last: RefCell::new(None),
        }
    }

    fn done(&self, error: ReportError, text: &str) -> Option<String> {
        let cb = self.ctx.callback(EventId::DonePackage)?;
        cb.arg(error.code()).arg(text).evaluate_str()
    }
}

impl InstallReport for InstallReceiver {
    fn start(&self, resolvable: &Resolvable) {
        self.throttle.reset();

        // A retried install starts again; report it once.
        if self.last.borrow().as_ref() == Some(resolvable) {
            return;
        }

        let repo = self.ctx.log_find_alias(&resolvable.repo_alias);
        self.ctx.report_source(repo, resolvable.medium_nr);

        if let Some(cb) = self.ctx.callback(EventId::StartPackage) {
            cb.arg(resolvable.name.as_str())
                .arg(file_name(&resolvable.location))
                .arg(resolvable.summary.as_str())
                .arg(resolvable.install_size)
                .arg(false)
                .evaluate();
        }
        *self.last.borrow_mut() = Some(resolvable.clone());
    }

    fn progress(&self, value: i32, _resolvable: &Resolvable) -> bool {
        let Some(cb) = self.ctx.callback(EventId::ProgressPackage) else {
            return true;
        };
        if !self.throttle.should_dispatch(i64::from(value)) {
            return true;
        }
        cb.arg(value).evaluate_bool().unwrap_or(true)
    }

    fn problem(
        &self,
        resolvable: &Resolvable,
        error: ReportError,
        description: &str,
        level: InstallLevel,
    ) -> ProblemAction {
        if level != InstallLevel::NoDepsForce {
            tracing::debug!(package = %resolvable, ?level, "Retrying with a higher level, problem not reported");
            return ProblemAction::Abort;
        }

        *self.last.borrow_mut() = None;
        match self.done(error, description) {
            Some(reply) => done_reply(&reply),
            None => ProblemAction::Abort,
        }
    }

    fn finish(
        &self,
        resolvable: &Resolvable,
        error: ReportError,
        reason: &str,
        level: InstallLevel,
    ) {
        if !error.is_ok() && level != InstallLevel::NoDepsForce {
            tracing::debug!(package = %resolvable, %error, "Suppressing finish of a retried install");
            return;
        }
        self.done(error, reason);
    }
}

pub struct RemoveReceiver {
    ctx: Rc<DispatchContext>,
}

impl RemoveReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }

    fn done(&self, error: ReportError, text: &str) -> Option<String> {
        let cb = self.ctx.callback(EventId::DonePackage)?;
        cb.arg(error.code()).arg(text).evaluate_str()
    }
}

impl RemoveReport for RemoveReceiver {
    fn start(&self, resolvable: &Resolvable) {
        if let Some(cb) = self.ctx.callback(EventId::StartPackage) {
            cb.arg(resolvable.name.as_str())
                .arg("")
                .arg("")
                .arg(-1_i64)
                .arg(true)
                .evaluate();
        }
    }

    fn progress(&self, value: i32, _resolvable: &Resolvable) -> bool {
        match self.ctx.callback(EventId::ProgressPackage) {
            Some(cb) => cb.arg(value).evaluate_bool().unwrap_or(true),
            None => true,
        }
    }

    fn problem(
        &self,
        _resolvable: &Resolvable,
        error: ReportError,
        description: &str,
    ) -> ProblemAction {
        match self.done(error, description) {
            Some(reply) => done_reply(&reply),
            None => ProblemAction::Abort,
        }
    }

    fn finish(&self, _resolvable: &Resolvable, error: ReportError, reason: &str) {
        self.done(error, reason);
    }
}
