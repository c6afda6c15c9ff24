use crate::{
    BatchPhase, ErrorLevel, HistoryEntry, Notification, OutputFormat, QrOptions, Theme,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub theme: Theme,
    pub form: FormView,
    pub busy: bool,
    pub batch: BatchView,
    pub history: Vec<HistoryRowView>,
    pub notifications: Vec<Notification>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormView {
    pub options: QrOptions,
    pub format: OutputFormat,
    pub preview_bytes: Option<usize>,
    /// False when foreground/background contrast falls below 3:1.
    pub contrast_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchView {
    pub phase: BatchPhase,
    pub progress_percent: u8,
    pub completed: usize,
    pub total: usize,
    /// Lines in the text area that would become codes.
    pub pending_lines: usize,
    pub size: u32,
    pub error_level: ErrorLevel,
    pub last_archive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub id: u64,
    pub text: String,
    pub size: u32,
    pub error_level: ErrorLevel,
    pub timestamp: String,
}

impl From<&HistoryEntry> for HistoryRowView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id,
            text: entry.text.clone(),
            size: entry.size,
            error_level: entry.error_level,
            timestamp: entry.timestamp.clone(),
        }
    }
}
