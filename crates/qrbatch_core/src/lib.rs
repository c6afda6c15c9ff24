//! QR batch core: domain types, validation and the pure UI state machine.
mod batch;
mod effect;
mod history;
mod msg;
mod options;
mod state;
mod update;
mod validate;
mod view_model;

pub use batch::{
    count_batch_lines, parse_batch, BatchPhase, BatchProgress, BatchRequest, FailureKind,
};
pub use effect::Effect;
pub use history::{HistoryEntry, HistoryLog};
pub use msg::{BatchFailure, BatchSummary, Msg, PreviewInfo};
pub use options::{
    ErrorLevel, OutputFormat, QrOptions, Theme, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND,
    DEFAULT_SIZE, MAX_BATCH_SIZE, MAX_HISTORY_ITEMS, MAX_TEXT_LENGTH, SIZE_MAX, SIZE_MIN,
    SIZE_STEP,
};
pub use state::{AppState, Notification, Severity};
pub use update::update;
pub use validate::{
    contrast_ratio, has_good_contrast, is_valid_hex_color, parse_hex_color, validate_size,
    validate_text, ValidationError,
};
pub use view_model::{AppViewModel, BatchView, FormView, HistoryRowView};
