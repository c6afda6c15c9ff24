use crate::{
    BatchPhase, BatchProgress, ErrorLevel, FailureKind, HistoryEntry, OutputFormat, QrOptions,
    Theme,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the text/URL field.
    TextChanged(String),
    /// User moved the size slider.
    SizeChanged(u32),
    ForegroundChanged(String),
    BackgroundChanged(String),
    ErrorLevelChanged(ErrorLevel),
    FormatChanged(OutputFormat),
    /// User asked for a preview of the current form.
    GenerateClicked,
    /// Engine finished rendering a preview.
    PreviewRendered {
        result: Result<PreviewInfo, String>,
    },
    /// User clicked Download.
    SaveClicked,
    /// Engine finished saving a single code rendered from `options`.
    SingleSaved {
        options: QrOptions,
        result: Result<String, String>,
    },
    /// User clicked Copy; the PNG goes to the clipboard.
    CopyClicked,
    /// Engine finished writing the clipboard.
    ImageCopied { result: Result<(), String> },
    /// History read from (or rewritten in) the persistent store.
    HistoryLoaded(Vec<HistoryEntry>),
    /// User picked a history card; its options are copied into the form.
    HistoryEntrySelected { id: u64 },
    HistoryClearClicked,
    /// Theme read from the persistent store at start-up.
    ThemeRestored(Theme),
    ThemeToggleClicked,
    ThemeSelected(Theme),
    /// User edited the batch text area.
    BatchInputChanged(String),
    BatchSizeChanged(u32),
    BatchErrorLevelChanged(ErrorLevel),
    /// User clicked "Generate & Download ZIP".
    BatchSubmitted,
    BatchCancelClicked,
    /// Engine moved the running batch to a new phase.
    BatchPhaseChanged(BatchPhase),
    /// Engine archived one more item.
    BatchProgressed(BatchProgress),
    /// Engine finished the run, successfully or not.
    BatchFinished {
        result: Result<BatchSummary, BatchFailure>,
    },
    /// A preference or history write failed.
    StoreFailed(String),
    NotificationsDismissed,
    /// Periodic tick from the front end.
    Tick,
}

/// Metadata of a rendered preview; the bytes stay with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub options: QrOptions,
    pub format: OutputFormat,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub archive_path: String,
    pub item_count: usize,
    /// Full history log after the run's entries were appended.
    pub history: Vec<HistoryEntry>,
    /// Set when the archive was saved but the history write failed.
    pub history_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub kind: FailureKind,
    pub message: String,
}
