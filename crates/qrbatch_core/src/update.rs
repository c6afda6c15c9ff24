use crate::msg::{BatchFailure, BatchSummary, PreviewInfo};
use crate::{
    has_good_contrast, parse_hex_color, validate_size, validate_text, AppState, BatchPhase,
    BatchProgress, BatchRequest, Effect, FailureKind, Msg, Notification, ValidationError,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::TextChanged(text) => {
            state.edit_form(|form| form.text = text);
            Vec::new()
        }
        Msg::SizeChanged(size) => {
            state.edit_form(|form| form.size = size);
            Vec::new()
        }
        Msg::ForegroundChanged(color) => {
            state.edit_form(|form| form.fg_color = color);
            Vec::new()
        }
        Msg::BackgroundChanged(color) => {
            state.edit_form(|form| form.bg_color = color);
            Vec::new()
        }
        Msg::ErrorLevelChanged(level) => {
            state.edit_form(|form| form.error_level = level);
            Vec::new()
        }
        Msg::FormatChanged(format) => {
            state.format = format;
            state.preview = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::GenerateClicked => generate(&mut state),
        Msg::PreviewRendered { result } => {
            apply_preview(&mut state, result);
            Vec::new()
        }
        Msg::SaveClicked => save(&mut state),
        Msg::SingleSaved { options, result } => {
            state.rendering = false;
            match result {
                Ok(path) => {
                    state.notify(Notification::success(
                        "Success",
                        format!("QR code downloaded successfully to {path}"),
                    ));
                    vec![Effect::AppendHistory {
                        drafts: vec![options],
                    }]
                }
                Err(message) => {
                    state.notify(Notification::error(
                        "Download Failed",
                        format!("Failed to download QR code: {message}"),
                    ));
                    Vec::new()
                }
            }
        }
        Msg::CopyClicked => copy(&mut state),
        Msg::ImageCopied { result } => {
            state.rendering = false;
            state.mark_dirty();
            match result {
                Ok(()) => state.notify(Notification::success(
                    "Copied!",
                    "QR code copied to clipboard",
                )),
                Err(_) => state.notify(Notification::error(
                    "Copy Failed",
                    "Failed to copy QR code. Try downloading instead.",
                )),
            }
            Vec::new()
        }
        Msg::HistoryLoaded(entries) => {
            state.history = crate::HistoryLog::from_entries(entries);
            state.mark_dirty();
            Vec::new()
        }
        Msg::HistoryEntrySelected { id } => {
            if let Some(options) = state.history.find(id).map(|entry| entry.options()) {
                state.edit_form(|form| *form = options);
            }
            Vec::new()
        }
        Msg::HistoryClearClicked => {
            if state.history.is_empty() {
                Vec::new()
            } else {
                state.history.clear();
                state.mark_dirty();
                vec![Effect::ClearHistory]
            }
        }
        Msg::ThemeRestored(theme) => {
            state.theme = theme;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ThemeToggleClicked => {
            state.theme = state.theme.toggled();
            state.mark_dirty();
            vec![Effect::PersistTheme(state.theme)]
        }
        Msg::ThemeSelected(theme) => {
            if state.theme == theme {
                Vec::new()
            } else {
                state.theme = theme;
                state.mark_dirty();
                vec![Effect::PersistTheme(theme)]
            }
        }
        Msg::BatchInputChanged(raw) => {
            if !state.batch.phase.is_active() {
                state.batch.input = raw;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BatchSizeChanged(size) => {
            if !state.batch.phase.is_active() {
                state.batch.size = size;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BatchErrorLevelChanged(level) => {
            if !state.batch.phase.is_active() {
                state.batch.error_level = level;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BatchSubmitted => submit_batch(&mut state),
        Msg::BatchCancelClicked => {
            if state.batch.phase.is_active() {
                vec![Effect::CancelBatch]
            } else {
                Vec::new()
            }
        }
        Msg::BatchPhaseChanged(next) => {
            // Terminal phases are applied together with `BatchFinished`.
            if !next.is_terminal() && state.batch.phase.can_transition_to(next) {
                state.batch.phase = next;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BatchProgressed(progress) => {
            apply_batch_progress(&mut state, progress);
            Vec::new()
        }
        Msg::BatchFinished { result } => {
            finish_batch(&mut state, result);
            Vec::new()
        }
        Msg::StoreFailed(message) => {
            state.notify(Notification::error(
                "Storage Error",
                format!("Could not save local data: {message}"),
            ));
            Vec::new()
        }
        Msg::NotificationsDismissed => {
            if !state.notifications.is_empty() {
                state.notifications.clear();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn validate_form(state: &AppState) -> Result<([u8; 3], [u8; 3]), ValidationError> {
    validate_text(&state.form.text)?;
    validate_size(state.form.size)?;
    let fg = parse_hex_color(&state.form.fg_color)?;
    let bg = parse_hex_color(&state.form.bg_color)?;
    Ok((fg, bg))
}

fn generate(state: &mut AppState) -> Vec<Effect> {
    if state.rendering {
        return Vec::new();
    }
    let (fg, bg) = match validate_form(state) {
        Ok(colors) => colors,
        Err(ValidationError::Empty) => {
            state.notify(Notification::error("Error", "Please enter text or URL"));
            return Vec::new();
        }
        Err(err) => {
            state.notify(Notification::error("Error", capitalize(&err.to_string())));
            return Vec::new();
        }
    };
    if !has_good_contrast(fg, bg) {
        state.notify(Notification::warning(
            "Low Contrast",
            "Foreground and background colors may be hard to scan",
        ));
    }
    state.rendering = true;
    state.preview = None;
    state.mark_dirty();
    vec![Effect::RenderPreview {
        options: state.form.clone(),
        format: state.format,
    }]
}

fn apply_preview(state: &mut AppState, result: Result<PreviewInfo, String>) {
    state.rendering = false;
    state.mark_dirty();
    match result {
        // A preview for options the user has since changed is stale.
        Ok(info) if info.options == state.form && info.format == state.format => {
            state.preview = Some(info);
        }
        Ok(_) => {}
        Err(message) => {
            state.notify(Notification::error(
                "Error",
                format!("Failed to render QR code: {message}"),
            ));
        }
    }
}

/// Claims the single-item slot for an export of the current preview.
fn start_export(state: &mut AppState) -> bool {
    if state.rendering {
        return false;
    }
    if state.preview.is_none() {
        state.notify(Notification::error(
            "Error",
            "Please generate a QR code first",
        ));
        return false;
    }
    state.rendering = true;
    state.mark_dirty();
    true
}

fn save(state: &mut AppState) -> Vec<Effect> {
    if !start_export(state) {
        return Vec::new();
    }
    vec![Effect::SaveSingle {
        options: state.form.clone(),
        format: state.format,
    }]
}

fn copy(state: &mut AppState) -> Vec<Effect> {
    if !start_export(state) {
        return Vec::new();
    }
    vec![Effect::CopyImage {
        options: state.form.clone(),
    }]
}

fn submit_batch(state: &mut AppState) -> Vec<Effect> {
    if state.batch.phase.is_active() {
        return Vec::new();
    }
    // A finished run leaves its terminal phase behind; the new run starts from Idle.
    state.batch.phase = BatchPhase::Parsing;
    state.batch.progress = BatchProgress::default();
    state.mark_dirty();

    match BatchRequest::from_raw(&state.batch.input, state.batch.size, state.batch.error_level) {
        Ok(request) => {
            state.batch.phase = BatchPhase::Encoding;
            state.batch.progress = BatchProgress::new(0, request.len());
            vec![Effect::RunBatch { request }]
        }
        Err(err) => {
            state.batch.phase = BatchPhase::Rejected;
            let message = match err {
                ValidationError::Empty => "Please enter at least one line of text".to_string(),
                ValidationError::TooMany { max, .. } => {
                    format!("Maximum {max} QR codes per batch")
                }
                other => capitalize(&other.to_string()),
            };
            state.notify(Notification::error("Error", message));
            Vec::new()
        }
    }
}

fn apply_batch_progress(state: &mut AppState, progress: BatchProgress) {
    let current = state.batch.progress;
    let accepted = state.batch.phase == BatchPhase::Encoding
        && progress.total == current.total
        && progress.completed >= current.completed
        && progress.completed <= progress.total;
    if accepted {
        state.batch.progress = progress;
        state.mark_dirty();
    }
}

fn finish_batch(state: &mut AppState, result: Result<BatchSummary, BatchFailure>) {
    if !state.batch.phase.is_active() {
        return;
    }
    match result {
        Ok(summary) => {
            state.batch.phase = BatchPhase::Done;
            state.batch.progress = BatchProgress::new(summary.item_count, summary.item_count);
            state.batch.input.clear();
            state.batch.last_archive = Some(summary.archive_path.clone());
            state.history = crate::HistoryLog::from_entries(summary.history);
            state.notify(Notification::success(
                "Success",
                format!(
                    "Generated {} QR codes successfully ({})",
                    summary.item_count, summary.archive_path
                ),
            ));
            if let Some(warning) = summary.history_warning {
                state.notify(Notification::error(
                    "Storage Error",
                    format!("Archive saved but history was not updated: {warning}"),
                ));
            }
        }
        Err(failure) => {
            state.batch.phase = BatchPhase::Aborted;
            let message = match failure.kind {
                FailureKind::Cancelled => "Batch generation was cancelled".to_string(),
                _ => format!("Failed to generate batch QR codes: {}", failure.message),
            };
            state.notify(Notification::error("Error", message));
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
