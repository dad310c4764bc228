//! The closed set of callback event ids.
//!
//! Each id names one host callback slot. The host registers a callable for
//! a slot through the operation named by [`EventId::builtin_name`], e.g.
//! `CallbackStartPackage("MyModule::StartPackage")`.

use std::fmt;

macro_rules! event_ids {
    ($($variant:ident => $builtin:literal,)+) => {
        /// Logical event class a host callback can be registered for.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventId {
            $(
                #[doc = concat!("Registered through `", $builtin, "`.")]
                $variant,
            )+
        }

        impl EventId {
            /// Every event id, in declaration order.
            pub const ALL: &'static [EventId] = &[$(Self::$variant,)+];

            /// Name of the host operation registering this event.
            pub fn builtin_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $builtin,)+
                }
            }

            /// Resolve a registration operation name back to its event id.
            pub fn from_builtin(name: &str) -> Option<Self> {
                match name {
                    $($builtin => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

event_ids! {
    StartProvide => "CallbackStartProvide",
    ProgressProvide => "CallbackProgressProvide",
    DoneProvide => "CallbackDoneProvide",
    StartPackage => "CallbackStartPackage",
    ProgressPackage => "CallbackProgressPackage",
    DonePackage => "CallbackDonePackage",
    SourceChange => "CallbackSourceChange",
    ResolvableReport => "CallbackResolvableReport",
    StartDeltaDownload => "CallbackStartDeltaDownload",
    ProgressDeltaDownload => "CallbackProgressDeltaDownload",
    ProblemDeltaDownload => "CallbackProblemDeltaDownload",
    FinishDeltaDownload => "CallbackFinishDeltaDownload",
    StartDeltaApply => "CallbackStartDeltaApply",
    ProgressDeltaApply => "CallbackProgressDeltaApply",
    ProblemDeltaApply => "CallbackProblemDeltaApply",
    FinishDeltaApply => "CallbackFinishDeltaApply",
    StartPatchDownload => "CallbackStartPatchDownload",
    ProgressPatchDownload => "CallbackProgressPatchDownload",
    ProblemPatchDownload => "CallbackProblemPatchDownload",
    FinishPatchDownload => "CallbackFinishPatchDownload",
    StartDownload => "CallbackStartDownload",
    ProgressDownload => "CallbackProgressDownload",
    DoneDownload => "CallbackDoneDownload",
    StartConvertDb => "CallbackStartConvertDb",
    ProgressConvertDb => "CallbackProgressConvertDb",
    NotifyConvertDb => "CallbackNotifyConvertDb",
    StopConvertDb => "CallbackStopConvertDb",
    StartRebuildDb => "CallbackStartRebuildDb",
    ProgressRebuildDb => "CallbackProgressRebuildDb",
    NotifyRebuildDb => "CallbackNotifyRebuildDb",
    StopRebuildDb => "CallbackStopRebuildDb",
    MediaChange => "CallbackMediaChange",
    SourceProbeStart => "CallbackSourceProbeStart",
    SourceProbeFailed => "CallbackSourceProbeFailed",
    SourceProbeSucceeded => "CallbackSourceProbeSucceeded",
    SourceProbeEnd => "CallbackSourceProbeEnd",
    SourceProbeProgress => "CallbackSourceProbeProgress",
    SourceProbeError => "CallbackSourceProbeError",
    SourceCreateInit => "CallbackSourceCreateInit",
    SourceCreateStart => "CallbackSourceCreateStart",
    SourceCreateProgress => "CallbackSourceCreateProgress",
    SourceCreateError => "CallbackSourceCreateError",
    SourceCreateEnd => "CallbackSourceCreateEnd",
    SourceCreateDestroy => "CallbackSourceCreateDestroy",
    SourceReportInit => "CallbackSourceReportInit",
    SourceReportStart => "CallbackSourceReportStart",
    SourceReportProgress => "CallbackSourceReportProgress",
    SourceReportError => "CallbackSourceReportError",
    SourceReportEnd => "CallbackSourceReportEnd",
    SourceReportDestroy => "CallbackSourceReportDestroy",
    ScriptStart => "CallbackScriptStart",
    ScriptProgress => "CallbackScriptProgress",
    ScriptProblem => "CallbackScriptProblem",
    ScriptFinish => "CallbackScriptFinish",
    Message => "CallbackMessage",
    ImportGpgKey => "CallbackImportGpgKey",
    AcceptUnknownGpgKey => "CallbackAcceptUnknownGpgKey",
    AcceptNonTrustedGpgKey => "CallbackAcceptNonTrustedGpgKey",
    AcceptUnsignedFile => "CallbackAcceptUnsignedFile",
    AcceptFileWithoutChecksum => "CallbackAcceptFileWithoutChecksum",
    AcceptVerificationFailed => "CallbackAcceptVerificationFailed",
    AcceptWrongDigest => "CallbackAcceptWrongDigest",
    AcceptUnknownDigest => "CallbackAcceptUnknownDigest",
    TrustedKeyAdded => "CallbackTrustedKeyAdded",
    TrustedKeyRemoved => "CallbackTrustedKeyRemoved",
}

/// Registration operations kept for host compatibility that no longer have
/// an event behind them.
pub const OBSOLETE_REGISTRATIONS: &[&str] = &[
    "CallbackYouProgress",
    "CallbackYouPatchProgress",
    "CallbackYouError",
    "CallbackYouMessage",
    "CallbackYouLog",
    "CallbackYouExecuteYcpScript",
    "CallbackYouScriptProgress",
    "CallbackStartRefresh",
    "CallbackDoneRefresh",
    "CallbackStartSourceRefresh",
    "CallbackProgressSourceRefresh",
    "CallbackErrorSourceRefresh",
    "CallbackEndSourceRefresh",
    "CallbackStartScanDb",
    "CallbackProgressScanDb",
    "CallbackErrorScanDb",
    "CallbackDoneScanDb",
];

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.builtin_name())
    }
}
