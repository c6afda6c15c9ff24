use crate::options::{ErrorLevel, MAX_BATCH_SIZE};
use crate::validate::validate_size;
use crate::ValidationError;

/// Splits raw batch text into trimmed, non-empty lines in their original order.
///
/// Fails with `empty` when nothing remains and `too-many` above 100 lines.
pub fn parse_batch(raw: &str) -> Result<Vec<String>, ValidationError> {
    let entries: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    check_entry_count(entries.len())?;
    Ok(entries)
}

/// Number of lines that would become codes; used for the live counter under the input box.
pub fn count_batch_lines(raw: &str) -> usize {
    raw.lines().filter(|line| !line.trim().is_empty()).count()
}

fn check_entry_count(count: usize) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::Empty);
    }
    if count > MAX_BATCH_SIZE {
        return Err(ValidationError::TooMany {
            count,
            max: MAX_BATCH_SIZE,
        });
    }
    Ok(())
}

/// A validated batch: 1..=100 entries, a slider-valid size and one error level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    entries: Vec<String>,
    size: u32,
    error_level: ErrorLevel,
}

impl BatchRequest {
    pub fn new(
        entries: Vec<String>,
        size: u32,
        error_level: ErrorLevel,
    ) -> Result<Self, ValidationError> {
        check_entry_count(entries.len())?;
        if entries.iter().any(|entry| entry.trim().is_empty()) {
            return Err(ValidationError::Empty);
        }
        validate_size(size)?;
        Ok(Self {
            entries,
            size,
            error_level,
        })
    }

    pub fn from_raw(raw: &str, size: u32, error_level: ErrorLevel) -> Result<Self, ValidationError> {
        Self::new(parse_batch(raw)?, size, error_level)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn error_level(&self) -> ErrorLevel {
        self.error_level
    }
}

/// Completed vs total items of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Rounded percentage for display (1 of 3 shows as 33).
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    Parsing,
    Rejected,
    Encoding,
    Archiving,
    Delivering,
    Done,
    Aborted,
}

impl BatchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchPhase::Rejected | BatchPhase::Done | BatchPhase::Aborted
        )
    }

    /// A run is in flight and owns the archive accumulator.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            BatchPhase::Parsing
                | BatchPhase::Encoding
                | BatchPhase::Archiving
                | BatchPhase::Delivering
        )
    }

    pub fn can_transition_to(self, next: BatchPhase) -> bool {
        use BatchPhase::*;
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Parsing, Rejected)
                | (Parsing, Encoding)
                | (Encoding, Aborted)
                | (Encoding, Archiving)
                | (Archiving, Aborted)
                | (Archiving, Delivering)
                | (Delivering, Aborted)
                | (Delivering, Done)
        )
    }
}

/// Why a run ended without delivering an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Encoding,
    Archive,
    Delivery,
    Store,
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FailureKind::Validation => "validation error",
            FailureKind::Encoding => "encoding error",
            FailureKind::Archive => "archive error",
            FailureKind::Delivery => "delivery error",
            FailureKind::Store => "store error",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}
