//! Media-change prompts.

use crate::context::{DispatchContext, ProbeMode};
use crate::report::{MediaChangeReport, MediaRequest};
use pkgbind_schema::{EventId, MediaAction, ReportError};
use std::rc::Rc;
use url::Url;

/// Decode the host's reply to a media-change prompt.
///
/// | reply       | action                      |
/// |-------------|-----------------------------|
/// | `""`        | retry                       |
/// | `"I"`       | ignore the wrong medium id  |
/// | `"C"`       | abort                       |
/// | `"E"`       | eject                       |
/// | `"E<n>"`    | eject, switch to device `n` |
/// | `"S"`       | skip the medium             |
/// | anything else | use it as the new URL; retry if it does not parse |
pub fn parse_media_reply(reply: &str) -> MediaAction {
    match reply {
        "" => MediaAction::Retry,
        "I" => MediaAction::IgnoreId,
        "C" => MediaAction::Abort,
        "E" => MediaAction::Eject { device: None },
        "S" => MediaAction::Ignore,
        _ if reply.starts_with('E') => {
            let digits: String = reply[1..].chars().take_while(char::is_ascii_digit).collect();
            let device = digits.parse().unwrap_or(0);
            tracing::info!("Ejecting device {device}");
            MediaAction::Eject {
                device: Some(device),
            }
        }
        _ => match Url::parse(reply) {
            Ok(url) => MediaAction::ChangeUrl(url),
            Err(e) => {
                tracing::warn!("Invalid URL {reply:?} in media change reply: {e}");
                MediaAction::Retry
            }
        },
    }
}

pub struct MediaChangeReceiver {
    ctx: Rc<DispatchContext>,
}

impl MediaChangeReceiver {
    pub fn new(ctx: Rc<DispatchContext>) -> Self {
        Self { ctx }
    }
}

impl MediaChangeReport for MediaChangeReceiver {
    fn request_media(&self, request: &MediaRequest<'_>) -> MediaAction {
        match self.ctx.probe_mode() {
            ProbeMode::Disable => return MediaAction::Abort,
            ProbeMode::OptionalFile if request.error == ReportError::NotFound => {
                return MediaAction::Abort;
            }
            _ => {}
        }

        let Some(cb) = self.ctx.callback(EventId::MediaChange) else {
            return MediaAction::Abort;
        };

        let redirected = self
            .ctx
            .redirects()
            .lookup(request.url, request.medium_nr)
            .cloned();
        let report_url = match redirected {
            Some(url) => {
                tracing::info!(original = %request.url, "Using redirected URL {url}");
                url
            }
            None => request.url.clone(),
        };

        // Double sided media are not distinguished, the last flag is
        // always false.
        let Some(reply) = cb
            .arg(request.description)
            .arg(report_url.as_str())
            .arg(request.label)
            .arg(0_i64)
            .arg("")
            .arg(request.medium_nr)
            .arg("")
            .arg(false)
            .evaluate_str()
        else {
            return MediaAction::Abort;
        };

        let action = parse_media_reply(&reply);
        if let MediaAction::ChangeUrl(url) = &action {
            // Recorded under the new URL, not the requested one.
            self.ctx
                .redirects()
                .record(url, request.medium_nr, url.clone());
            tracing::info!("Source redirected to {url}");
        }
        action
    }
}
