use crate::{BatchRequest, OutputFormat, QrOptions, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RenderPreview {
        options: QrOptions,
        format: OutputFormat,
    },
    SaveSingle {
        options: QrOptions,
        format: OutputFormat,
    },
    /// Always PNG, whatever the selected download format.
    CopyImage { options: QrOptions },
    RunBatch { request: BatchRequest },
    CancelBatch,
    /// Append entries (oldest first) to the persisted history log.
    AppendHistory { drafts: Vec<QrOptions> },
    ClearHistory,
    PersistTheme(Theme),
}
