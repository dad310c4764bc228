//! Repository creation, type probing and refresh reports.

use crate::context::{DispatchContext, ProbeMode};
use crate::host::Callback;
use crate::repos::RepoInfo;
use crate::report::{ProbeRepoReport, RepoCreateReport, RepoReport};
use pkgbind_schema::{EventId, ProblemAction, ReportError};
use std::rc::Rc;
use url::Url;

/// Decode the symbol a repository problem callback returns.
pub fn parse_repo_symbol(symbol: &str) -> Option<ProblemAction> {
    match symbol {
        "ABORT" => Some(ProblemAction::Abort),
        "RETRY" => Some(ProblemAction::Retry),
        "IGNORE" => Some(ProblemAction::Ignore),
        _ => None,
    }
}

/// Ask the host and decode its symbol, falling back to abort.
fn decide(cb: Callback) -> ProblemAction {
    let event = cb.event();
    let Some(symbol) = cb.evaluate_symbol() else {
        return ProblemAction::Abort;
    };
    parse_repo_symbol(&symbol).unwrap_or_else(|| {
        tracing::error!(%event, "Unexpected symbol '{symbol}' returned from callback");
        ProblemAction::Abort
    })
}

fn notify(ctx: &DispatchContext, event: EventId) {
    if let Some(cb) = ctx.callback(event) {
        cb.evaluate();
    }
}

pub struct RepoCreateReceiver {
    ctx: Rc<DispatchContext>,
}

impl RepoCreateReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl RepoCreateReport for RepoCreateReceiver {
    fn report_begin(&self) {
        tracing::debug!("Repo create begin");
        notify(&self.ctx, EventId::SourceCreateInit);
    }

    fn report_end(&self) {
        tracing::debug!("Repo create end");
        notify(&self.ctx, EventId::SourceCreateDestroy);
    }

    fn start(&self, url: &Url) {
        if let Some(cb) = self.ctx.callback(EventId::SourceCreateStart) {
            cb.arg(url.as_str()).evaluate();
        }
    }

    fn progress(&self, value: i32) -> bool {
        match self.ctx.callback(EventId::SourceCreateProgress) {
            Some(cb) => cb.arg(value).evaluate_bool().unwrap_or(true),
            None => true,
        }
    }

    fn problem(&self, url: &Url, error: ReportError, description: &str) -> ProblemAction {
        match self.ctx.callback(EventId::SourceCreateError) {
            Some(cb) => decide(
                cb.arg(url.as_str())
                    .arg(error.as_str())
                    .arg(description),
            ),
            None => ProblemAction::Abort,
        }
    }

    fn finish(&self, url: &Url, error: ReportError, reason: &str) {
        if let Some(cb) = self.ctx.callback(EventId::SourceCreateEnd) {
            cb.arg(url.as_str())
                .arg(error.as_str())
                .arg(reason)
                .evaluate();
        }
    }
}

/// Repository type detection. Prompts are disabled while a probe runs.
pub struct ProbeRepoReceiver {
    ctx: Rc<DispatchContext>,
}

impl ProbeRepoReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }

    fn url_and_type(&self, event: EventId, url: &Url, type_name: &str) {
        if let Some(cb) = self.ctx.callback(event) {
            cb.arg(url.as_str()).arg(type_name).evaluate();
        }
    }
}

impl ProbeRepoReport for ProbeRepoReceiver {
    fn start(&self, url: &Url) {
        self.ctx.set_probe_mode(ProbeMode::Disable);
        if let Some(cb) = self.ctx.callback(EventId::SourceProbeStart) {
            cb.arg(url.as_str()).evaluate();
        }
    }

    fn failed_probe(&self, url: &Url, type_name: &str) {
        self.url_and_type(EventId::SourceProbeFailed, url, type_name);
    }

    fn success_probe(&self, url: &Url, type_name: &str) {
        self.url_and_type(EventId::SourceProbeSucceeded, url, type_name);
    }

    fn finish(&self, url: &Url, error: ReportError, reason: &str) {
        self.ctx.set_probe_mode(ProbeMode::Full);
        if let Some(cb) = self.ctx.callback(EventId::SourceProbeEnd) {
            cb.arg(url.as_str())
                .arg(error.as_str())
                .arg(reason)
                .evaluate();
        }
    }

    fn progress(&self, url: &Url, value: i32) -> bool {
        match self.ctx.callback(EventId::SourceProbeProgress) {
            Some(cb) => cb.arg(url.as_str()).arg(value).evaluate_bool().unwrap_or(true),
            None => true,
        }
    }

    fn problem(&self, url: &Url, error: ReportError, description: &str) -> ProblemAction {
        match self.ctx.callback(EventId::SourceProbeError) {
            Some(cb) => decide(
                cb.arg(url.as_str())
                    .arg(error.as_str())
                    .arg(description),
            ),
            None => ProblemAction::Abort,
        }
    }
}

/// Refresh and load of registered repositories.
pub struct RepoReceiver {
    ctx: Rc<DispatchContext>,
}

impl RepoReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl RepoReport for RepoReceiver {
    fn report_begin(&self) {
        tracing::debug!("Source report begin");
        notify(&self.ctx, EventId::SourceReportInit);
    }

    fn report_end(&self) {
        tracing::debug!("Source report end");
        notify(&self.ctx, EventId::SourceReportDestroy);
    }

    fn start(&self, task: &str, repo: &RepoInfo) {
        if let Some(cb) = self.ctx.callback(EventId::SourceReportStart) {
            cb.arg(self.ctx.log_find_alias(&repo.alias))
                .arg(repo.first_url())
                .arg(task)
                .evaluate();
        }
    }

    fn progress(&self, value: i32) -> bool {
        match self.ctx.callback(EventId::SourceReportProgress) {
            Some(cb) => cb.arg(value).evaluate_bool().unwrap_or(true),
            None => true,
        }
    }

    fn problem(&self, repo: &RepoInfo, error: ReportError, description: &str) -> ProblemAction {
        if self.ctx.probe_mode() == ProbeMode::OptionalFile {
            tracing::info!(repo = %repo.alias, "The file is optional, ignoring the error");
            return ProblemAction::Ignore;
        }
        match self.ctx.callback(EventId::SourceReportError) {
            Some(cb) => decide(
                cb.arg(self.ctx.log_find_alias(&repo.alias))
                    .arg(repo.first_url())
                    .arg(error.as_str())
                    .arg(description),
            ),
            None => ProblemAction::Abort,
        }
    }

    fn finish(&self, repo: &RepoInfo, task: &str, error: ReportError, reason: &str) {
        if let Some(cb) = self.ctx.callback(EventId::SourceReportEnd) {
            cb.arg(self.ctx.log_find_alias(&repo.alias))
                .arg(repo.first_url())
                .arg(task)
                .arg(error.as_str())
                .arg(reason)
                .evaluate();
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

    fn oss() -> RepoInfo {
        RepoInfo::new("oss", Url::parse("http://download.example.com/oss/").unwrap())
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_repo_symbol("RETRY"), Some(ProblemAction::Retry));
        assert_eq!(parse_repo_symbol("IGNORE"), Some(ProblemAction::Ignore));
        assert_eq!(parse_repo_symbol("abort"), None);
    }

    #[test]
    fn test_probe_toggles_silent_mode() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::SourceProbeStart, "ProbeStart");
        let rx = ProbeRepoReceiver::new(ctx.clone());
        let url = Url::parse("dvd:///").unwrap();
        rx.start(&url);
        assert_eq!(ctx.probe_mode(), ProbeMode::Disable);
        rx.finish(&url, ReportError::NoError, "");
        assert_eq!(ctx.probe_mode(), ProbeMode::Full);
        assert_eq!(host.calls_to("ProbeStart"), vec![vec![Value::from("dvd:///")]]);
    }

    #[test]
    fn test_create_problem_symbol() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::SourceCreateError, "Error");
        let rx = RepoCreateReceiver::new(ctx);
        let url = Url::parse("http://example.com/repo").unwrap();

        host.reply("Error", Value::symbol("RETRY"));
        assert_eq!(rx.problem(&url, ReportError::Io, "timeout"), ProblemAction::Retry);
        host.reply("Error", Value::symbol("MAYBE"));
        assert_eq!(rx.problem(&url, ReportError::Io, "timeout"), ProblemAction::Abort);
        host.reply("Error", Value::from("RETRY"));
        assert_eq!(rx.problem(&url, ReportError::Io, "timeout"), ProblemAction::Abort);
        assert_eq!(host.calls_to("Error")[0][1], Value::from("IO"));
    }

    #[test]
    fn test_report_uses_repo_id_and_first_url() {
        let (host, ctx) = setup();
        ctx.repos_mut().add(oss());
        ctx.set_callback(EventId::SourceReportEnd, "End");
        RepoReceiver::new(ctx).finish(&oss(), "Refreshing", ReportError::NotFound, "404");
        assert_eq!(
            host.calls_to("End")[0],
            vec![
                Value::Integer(0),
                Value::from("http://download.example.com/oss/"),
                Value::from("Refreshing"),
                Value::from("NOT_FOUND"),
                Value::from("404"),
            ]
        );
    }

    #[test]
    fn test_optional_file_problem_ignored_silently() {
        let (host, ctx) = setup();
        ctx.set_callback(EventId::SourceReportError, "Error");
        let rx = RepoReceiver::new(ctx.clone());
        let _guard = ctx.optional_file_scope();
        assert_eq!(
            rx.problem(&oss(), ReportError::NotFound, "missing"),
            ProblemAction::Ignore
        );
        assert!(host.calls_to("Error").is_empty());
    }
}
