use std::path::PathBuf;

use bytes::Bytes;
use qrbatch_core::{
    BatchFailure, BatchPhase, BatchProgress, BatchSummary, FailureKind, HistoryEntry,
    OutputFormat, QrOptions, ValidationError,
};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::deliver::DeliveryError;
use crate::encode::EncodingError;
use crate::store::StoreError;

pub type RunId = u64;

/// One rendered batch entry on its way into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedItem {
    /// 0-based position in the request.
    pub index: usize,
    pub source_text: String,
    pub image: Bytes,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    pub blob: Bytes,
    pub suggested_filename: String,
    pub entry_names: Vec<String>,
}

/// Emitted after an item has been encoded and added to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCompleted {
    pub index: usize,
    pub filename: String,
    pub progress: BatchProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub archive_path: PathBuf,
    pub item_count: usize,
    pub history: Vec<HistoryEntry>,
    pub history_warning: Option<String>,
}

impl From<BatchOutcome> for BatchSummary {
    fn from(outcome: BatchOutcome) -> Self {
        BatchSummary {
            archive_path: outcome.archive_path.display().to_string(),
            item_count: outcome.item_count,
            history: outcome.history,
            history_warning: outcome.history_warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub format: OutputFormat,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PhaseChanged {
        run_id: RunId,
        phase: BatchPhase,
    },
    ItemCompleted {
        run_id: RunId,
        item: ItemCompleted,
    },
    BatchFinished {
        run_id: RunId,
        result: Result<BatchSummary, BatchFailure>,
    },
    PreviewRendered {
        options: QrOptions,
        result: Result<RenderedImage, String>,
    },
    SingleSaved {
        options: QrOptions,
        result: Result<SavedImage, String>,
    },
    ImageCopied {
        result: Result<(), String>,
    },
}

/// Fatal error of a batch run; the run ends in `Rejected` or `Aborted`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("item {index} could not be encoded: {source}")]
    Encoding {
        /// 1-based, matching the archive entry name.
        index: usize,
        #[source]
        source: EncodingError,
    },
    #[error("archive could not be built: {0}")]
    Archive(#[from] ArchiveError),
    #[error("output could not be delivered: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("history could not be updated: {0}")]
    Store(#[from] StoreError),
    #[error("cancelled after {completed} of {total} items")]
    Cancelled { completed: usize, total: usize },
    #[error("run stopped after {completed} of {total} items")]
    Incomplete { completed: usize, total: usize },
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Validation(_) => FailureKind::Validation,
            PipelineError::Encoding { .. } => FailureKind::Encoding,
            PipelineError::Archive(_) | PipelineError::Incomplete { .. } => FailureKind::Archive,
            PipelineError::Delivery(_) => FailureKind::Delivery,
            PipelineError::Store(_) => FailureKind::Store,
            PipelineError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    pub fn to_failure(&self) -> BatchFailure {
        BatchFailure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}
