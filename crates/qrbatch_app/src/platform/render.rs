use std::io::{self, Write};

use chrono::{DateTime, Local};
use qrbatch_core::{AppViewModel, BatchPhase, HistoryRowView, Notification, Severity, Theme};

const BAR_WIDTH: usize = 30;
const TEXT_PREVIEW_CHARS: usize = 48;

/// Line-oriented terminal view of the application state.
pub struct TerminalRenderer<W: Write> {
    out: W,
    last_batch: Option<(BatchPhase, u8)>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_batch: None,
        }
    }

    /// Prints what changed since the previous call; only batch progress is incremental.
    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        let batch = &view.batch;
        if batch.total == 0 || batch.phase == BatchPhase::Idle {
            return Ok(());
        }
        let key = (batch.phase, batch.progress_percent);
        if self.last_batch == Some(key) {
            return Ok(());
        }
        self.last_batch = Some(key);
        writeln!(
            self.out,
            "{} {:>3}% ({}/{}) {}",
            progress_bar(batch.progress_percent),
            batch.progress_percent,
            batch.completed,
            batch.total,
            phase_label(batch.phase)
        )
    }

    pub fn notifications(&mut self, notes: &[Notification]) -> io::Result<()> {
        for note in notes {
            let tag = match note.severity {
                Severity::Success => "ok",
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            writeln!(self.out, "[{tag}] {}: {}", note.title, note.message)?;
        }
        Ok(())
    }

    pub fn preview(&mut self, view: &AppViewModel) -> io::Result<()> {
        match view.form.preview_bytes {
            Some(len) => writeln!(
                self.out,
                "Preview ready: {format} {size}x{size} px, level {level}, {len} bytes",
                format = view.form.format,
                size = view.form.options.size,
                level = view.form.options.error_level,
            ),
            None => Ok(()),
        }
    }

    pub fn form(&mut self, view: &AppViewModel) -> io::Result<()> {
        let options = &view.form.options;
        writeln!(
            self.out,
            "Loaded: {text}  {size}px  level {level}  {fg} on {bg}",
            text = truncate(&options.text, TEXT_PREVIEW_CHARS),
            size = options.size,
            level = options.error_level,
            fg = options.fg_color,
            bg = options.bg_color,
        )
    }

    pub fn history(&mut self, rows: &[HistoryRowView]) -> io::Result<()> {
        if rows.is_empty() {
            return writeln!(self.out, "No QR codes generated yet");
        }
        for row in rows {
            writeln!(
                self.out,
                "{:>15}  {}  {:>3}px  {}  {}",
                row.id,
                format_timestamp(&row.timestamp),
                row.size,
                row.error_level,
                truncate(&row.text, TEXT_PREVIEW_CHARS)
            )?;
        }
        Ok(())
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn theme(&mut self, theme: Theme) -> io::Result<()> {
        writeln!(self.out, "Theme: {theme}")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

fn phase_label(phase: BatchPhase) -> &'static str {
    match phase {
        BatchPhase::Idle => "",
        BatchPhase::Parsing => "parsing",
        BatchPhase::Rejected => "rejected",
        BatchPhase::Encoding => "encoding",
        BatchPhase::Archiving => "building archive",
        BatchPhase::Delivering => "saving",
        BatchPhase::Done => "done",
        BatchPhase::Aborted => "aborted",
    }
}

fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
