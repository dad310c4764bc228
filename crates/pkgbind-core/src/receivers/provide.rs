//! Fetching resolvables, delta RPMs and patch RPMs.

use crate::context::DispatchContext;
use crate::report::DownloadResolvableReport;
use crate::throttle::Throttle;
use pkgbind_schema::{
    EventId, ProblemAction, ReportError, ResKind, Resolvable, is_remote_scheme,
};
use std::path::Path;
use std::rc::Rc;
use url::Url;

pub struct DownloadResolvableReceiver {
    ctx: Rc<DispatchContext>,
    provide: Throttle,
    delta_download: Throttle,
    delta_apply: Throttle,
    patch_download: Throttle,
}

impl DownloadResolvableReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self {
            provide: ctx.throttle(),
            delta_download: ctx.throttle(),
            delta_apply: ctx.throttle(),
            patch_download: ctx.throttle(),
            ctx,
        }
    }

    fn done(&self, error: ReportError, text: &str, name: &str) -> Option<String> {
        let cb = self.ctx.callback(EventId::DoneProvide)?;
        cb.arg(error.code()).arg(text).arg(name).evaluate_str()
    }

    /// Throttled progress of a sub-stream, `true` (continue) when not sent.
    fn progress_on(&self, event: EventId, throttle: &Throttle, value: i32) -> Option<bool> {
        let cb = self.ctx.callback(event)?;
        if !throttle.should_dispatch(i64::from(value)) {
            return None;
        }
        cb.arg(value).evaluate_bool()
    }

    fn start_file(&self, event: EventId, throttle: &Throttle, file: &Path, size: u64) {
        throttle.reset();
        if let Some(cb) = self.ctx.callback(event) {
            cb.arg(file.to_string_lossy().as_ref()).arg(size).evaluate();
        }
    }

    fn notify(&self, event: EventId, text: Option<&str>) {
        if let Some(cb) = self.ctx.callback(event) {
            match text {
                Some(text) => cb.arg(text).evaluate(),
                None => cb.evaluate(),
            };
        }
    }
}

impl DownloadResolvableReport for DownloadResolvableReceiver {
    fn start(&self, resolvable: &Resolvable, url: &Url) {
        self.provide.reset();

        let size = if resolvable.kind() == ResKind::Package {
            let repo = self.ctx.log_find_alias(&resolvable.repo_alias);
            self.ctx.report_source(repo, resolvable.medium_nr);
            resolvable.download_size
        } else {
            0
        };

        if let Some(cb) = self.ctx.callback(EventId::StartProvide) {
            cb.arg(resolvable.name.as_str())
                .arg(size)
                .arg(is_remote_scheme(url.scheme()))
                .evaluate();
        }
    }

    fn progress(&self, value: i32, _resolvable: &Resolvable) -> bool {
        self.progress_on(EventId::ProgressProvide, &self.provide, value)
            .unwrap_or(true)
    }

    fn problem(
        &self,
        resolvable: &Resolvable,
        error: ReportError,
        description: &str,
    ) -> ProblemAction {
        let Some(reply) = self.done(error, description, &resolvable.name) else {
            return ProblemAction::Abort;
        };
        match reply.as_str() {
            "R" => ProblemAction::Retry,
            "C" => ProblemAction::Abort,
            "I" => ProblemAction::Ignore,
            other => {
                tracing::warn!(
                    package = %resolvable,
                    "Unknown DoneProvide reply {other:?}, using the default action"
                );
                ProblemAction::Abort
            }
        }
    }

    fn finish(&self, resolvable: &Resolvable, error: ReportError, reason: &str) {
        self.done(error, reason, &resolvable.name);
    }

    fn start_delta_download(&self, file: &Path, download_size: u64) {
        self.start_file(
            EventId::StartDeltaDownload,
            &self.delta_download,
            file,
            download_size,
        );
    }

    fn progress_delta_download(&self, value: i32) -> bool {
        self.progress_on(EventId::ProgressDeltaDownload, &self.delta_download, value)
            .unwrap_or(true)
    }

    fn problem_delta_download(&self, description: &str) {
        self.notify(EventId::ProblemDeltaDownload, Some(description));
    }

    fn finish_delta_download(&self) {
        self.notify(EventId::FinishDeltaDownload, None);
    }

    fn start_delta_apply(&self, file: &Path) {
        self.delta_apply.reset();
        if let Some(cb) = self.ctx.callback(EventId::StartDeltaApply) {
            cb.arg(file.to_string_lossy().as_ref()).evaluate();
        }
    }

    fn progress_delta_apply(&self, value: i32) {
        // Informational, the engine cannot abort applying a delta.
        let _ = self.progress_on(EventId::ProgressDeltaApply, &self.delta_apply, value);
    }

    fn problem_delta_apply(&self, description: &str) {
        self.notify(EventId::ProblemDeltaApply, Some(description));
    }

    fn finish_delta_apply(&self) {
        self.notify(EventId::FinishDeltaApply, None);
    }

    fn start_patch_download(&self, file: &Path, download_size: u64) {
        self.start_file(
            EventId::StartPatchDownload,
            &self.patch_download,
            file,
            download_size,
        );
    }

    fn progress_patch_download(&self, value: i32) -> bool {
        self.progress_on(EventId::ProgressPatchDownload, &self.patch_download, value)
            .unwrap_or(true)
    }

    fn problem_patch_download(&self, description: &str) {
        self.notify(EventId::ProblemPatchDownload, Some(description));
    }

    fn finish_patch_download(&self) {
        self.notify(EventId::FinishPatchDownload, None);
    }
}
