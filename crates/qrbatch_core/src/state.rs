use crate::msg::PreviewInfo;
use crate::view_model::{AppViewModel, BatchView, FormView, HistoryRowView};
use crate::{
    count_batch_lines, has_good_contrast, parse_hex_color, BatchPhase, BatchProgress, ErrorLevel,
    HistoryEntry, HistoryLog, OutputFormat, QrOptions, Theme, DEFAULT_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Transient, user-visible message; drained by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, message)
    }

    pub fn warning(title: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    fn new(severity: Severity, title: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchState {
    pub(crate) input: String,
    pub(crate) size: u32,
    pub(crate) error_level: ErrorLevel,
    pub(crate) phase: BatchPhase,
    pub(crate) progress: BatchProgress,
    pub(crate) last_archive: Option<String>,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            input: String::new(),
            size: DEFAULT_SIZE,
            error_level: ErrorLevel::default(),
            phase: BatchPhase::Idle,
            progress: BatchProgress::default(),
            last_archive: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) form: QrOptions,
    pub(crate) format: OutputFormat,
    pub(crate) preview: Option<PreviewInfo>,
    /// A single-item render or save is in flight.
    pub(crate) rendering: bool,
    pub(crate) theme: Theme,
    pub(crate) history: HistoryLog,
    pub(crate) batch: BatchState,
    pub(crate) notifications: Vec<Notification>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let contrast_ok = match (
            parse_hex_color(&self.form.fg_color),
            parse_hex_color(&self.form.bg_color),
        ) {
            (Ok(fg), Ok(bg)) => has_good_contrast(fg, bg),
            _ => true,
        };
        AppViewModel {
            theme: self.theme,
            form: FormView {
                options: self.form.clone(),
                format: self.format,
                preview_bytes: self.preview.as_ref().map(|p| p.byte_len),
                contrast_ok,
            },
            busy: self.rendering || self.batch.phase.is_active(),
            batch: BatchView {
                phase: self.batch.phase,
                progress_percent: self.batch.progress.percent(),
                completed: self.batch.progress.completed,
                total: self.batch.progress.total,
                pending_lines: count_batch_lines(&self.batch.input),
                size: self.batch.size,
                error_level: self.batch.error_level,
                last_archive: self.batch.last_archive.clone(),
            },
            history: self.history.entries().iter().map(HistoryRowView::from).collect(),
            notifications: self.notifications.clone(),
            dirty: self.dirty,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn batch_phase(&self) -> BatchPhase {
        self.batch.phase
    }

    pub fn history_snapshot(&self) -> Vec<HistoryEntry> {
        self.history.entries().to_vec()
    }

    /// No single-item operation or batch run is waiting on the engine.
    pub fn is_settled(&self) -> bool {
        !self.rendering && !self.batch.phase.is_active()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
        self.dirty = true;
    }

    /// Applies a form edit; any rendered preview no longer matches the form.
    pub(crate) fn edit_form(&mut self, edit: impl FnOnce(&mut QrOptions)) {
        edit(&mut self.form);
        self.preview = None;
        self.dirty = true;
    }
}
