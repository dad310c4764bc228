//! Raw file transfers.

use crate::context::{DispatchContext, ProbeMode};
use crate::report::DownloadProgressReport;
use crate::throttle::Throttle;
use pkgbind_schema::{EventId, ProblemAction, ReportError};
use std::path::Path;
use std::rc::Rc;
use url::Url;

pub struct DownloadProgressReceiver {
    ctx: Rc<DispatchContext>,
    throttle: Throttle,
}

impl DownloadProgressReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        let throttle = ctx.throttle();
        Self { ctx, throttle }
    }
}

impl DownloadProgressReport for DownloadProgressReceiver {
    fn start(&self, file: &Url, local: &Path) {
        self.throttle.reset();
        if let Some(cb) = self.ctx.callback(EventId::StartDownload) {
            cb.arg(file.as_str())
                .arg(local.to_string_lossy().as_ref())
                .evaluate();
        }
    }

    fn progress(&self, value: i32, _file: &Url, bps_avg: f64, bps_current: f64) -> bool {
        let Some(cb) = self.ctx.callback(EventId::ProgressDownload) else {
            return true;
        };
        if !self.throttle.should_dispatch(i64::from(value)) {
            return true;
        }
        cb.arg(value)
            .arg(bps_avg as i64)
            .arg(bps_current as i64)
            .evaluate_bool()
            .unwrap_or(true)
    }

    fn problem(&self, file: &Url, error: ReportError, description: &str) -> ProblemAction {
        let Some(cb) = self.ctx.callback(EventId::DoneProvide) else {
            return ProblemAction::Abort;
        };
        let Some(reply) = cb
            .arg(error.code())
            .arg(description)
            .arg(file.as_str())
            .evaluate_str()
        else {
            return ProblemAction::Abort;
        };
        match reply.as_str() {
            "R" => ProblemAction::Retry,
            "C" => ProblemAction::Abort,
            "I" => ProblemAction::Ignore,
            other => {
                tracing::warn!(%file, "Unknown DoneProvide reply {other:?}, using the default action");
                ProblemAction::Abort
            }
        }
    }

    fn finish(&self, _file: &Url, error: ReportError, reason: &str) {
        let error = match self.ctx.probe_mode() {
            ProbeMode::Disable | ProbeMode::OptionalFile if !error.is_ok() => {
                tracing::debug!(%error, "Silent probing, not reporting the download error");
                ReportError::NoError
            }
            _ => error,
        };
        if let Some(cb) = self.ctx.callback(EventId::DoneDownload) {
            cb.arg(error.code()).arg(reason).evaluate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use crate::throttle::ThrottleConfig;
    use pkgbind_schema::Value;

    fn setup() -> (Rc<RecordingHost>, Rc<DispatchContext>) {
        let host = Rc::new(RecordingHost::new());
        let ctx = Rc::new(DispatchContext::new(host.clone(), ThrottleConfig::default()));
        (host, ctx)
    }

    #[test]
    fn test_progress_carries_rates() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::ProgressDownload, "Progress");
        host.reply("Progress", Value::Bool(true));
        let rx = DownloadProgressReceiver::new(ctx);
        let url = Url::parse("http://example.com/repomd.xml").unwrap();
        rx.start(&url, Path::new("/tmp/repomd.xml"));
        assert!(rx.progress(40, &url, 1024.7, 2048.2));
        assert_eq!(
            host.calls_to("Progress"),
            vec![vec![Value::Integer(40), Value::Integer(1024), Value::Integer(2048)]]
        );
    }

    #[test]
    fn test_finish_error_hidden_while_probing() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::DoneDownload, "Done");
        let rx = DownloadProgressReceiver::new(ctx.clone());
        let url = Url::parse("http://example.com/media.1/media").unwrap();

        ctx.set_probe_mode(ProbeMode::Disable);
        rx.finish(&url, ReportError::NotFound, "missing");
        ctx.set_probe_mode(ProbeMode::Full);
        rx.finish(&url, ReportError::NotFound, "missing");

        let codes: Vec<_> = host.calls_to("Done").into_iter().map(|c| c[0].clone()).collect();
        assert_eq!(codes, vec![Value::Integer(0), Value::Integer(1)]);
    }

    #[test]
    fn test_problem_reply_mapping() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::DoneProvide, "Done");
        let rx = DownloadProgressReceiver::new(ctx);
        let url = Url::parse("http://example.com/repodata/primary.xml.gz").unwrap();

        let cases = [
            ("R", ProblemAction::Retry),
            ("C", ProblemAction::Abort),
            ("I", ProblemAction::Ignore),
            ("X", ProblemAction::Abort),
            ("", ProblemAction::Abort),
        ];
        for (reply, expected) in cases {
            host.reply("Done", reply.into());
            assert_eq!(rx.problem(&url, ReportError::Io, "connection reset"), expected, "{reply:?}");
        }
        assert_eq!(
            host.calls_to("Done")[0],
            vec![
                Value::Integer(ReportError::Io.code()),
                "connection reset".into(),
                url.as_str().into(),
            ]
        );
    }
}
