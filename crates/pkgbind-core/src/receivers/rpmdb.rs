//! RPM database conversion and rebuild.
//!
//! Both are informational: the host is told about progress but cannot stop
//! the operation.

use crate::context::DispatchContext;
use crate::report::{ConvertDbReport, RebuildDbReport};
use pkgbind_schema::{EventId, ReportError};
use std::path::Path;
use std::rc::Rc;

pub struct ConvertDbReceiver {
    ctx: Rc<DispatchContext>,
}

impl ConvertDbReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl ConvertDbReport for ConvertDbReceiver {
    fn start(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Converting RPM database");
        if let Some(cb) = self.ctx.callback(EventId::StartConvertDb) {
            cb.arg(path.to_string_lossy().as_ref()).evaluate();
        }
    }

    fn progress(&self, value: i32, path: &Path) -> bool {
        if let Some(cb) = self.ctx.callback(EventId::ProgressConvertDb) {
            cb.arg(value).arg(path.to_string_lossy().as_ref()).evaluate();
        }
        true
    }

    fn finish(&self, _path: &Path, error: ReportError, reason: &str) {
        if let Some(cb) = self.ctx.callback(EventId::StopConvertDb) {
            cb.arg(error.code()).arg(reason).evaluate();
        }
    }
}

pub struct RebuildDbReceiver {
    ctx: Rc<DispatchContext>,
}

impl RebuildDbReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl RebuildDbReport for RebuildDbReceiver {
    fn start(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Rebuilding RPM database");
        if let Some(cb) = self.ctx.callback(EventId::StartRebuildDb) {
            cb.evaluate();
        }
    }

    fn progress(&self, value: i32, _path: &Path) -> bool {
        if let Some(cb) = self.ctx.callback(EventId::ProgressRebuildDb) {
            cb.arg(value).evaluate();
        }
        true
    }

    fn finish(&self, _path: &Path, error: ReportError, reason: &str) {
        if let Some(cb) = self.ctx.callback(EventId::StopRebuildDb) {
            cb.arg(error.code()).arg(reason).evaluate();
        }
    }
}
