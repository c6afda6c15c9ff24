//! QR batch engine: encoding, archiving, saving and persisted state.
mod archive;
mod deliver;
mod encode;
mod engine;
mod filename;
mod persist;
mod pipeline;
mod progress;
mod store;
mod types;

pub use archive::{ArchiveAssembler, ArchiveError};
pub use deliver::{DeliveryError, DirectorySaver, FileSaver, ImageClipboard, SystemClipboard};
pub use encode::{EncodingError, QrCodeEncoder, QrEncoder, RenderOptions, DEFAULT_MARGIN};
pub use engine::{Clock, Engine, EngineConfig, EngineHandle};
pub use filename::{
    archive_entry_name, batch_archive_filename, sanitize_prefix, single_download_filename,
    ENTRY_PREFIX_CHARS,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::BatchRun;
pub use progress::{ChannelProgressSink, NullProgressSink, ProgressSink};
pub use store::{KeyValueStore, MemoryStore, StateStore, StoreError, HISTORY_KEY, THEME_KEY};
pub use types::{
    ArchiveResult, BatchOutcome, EncodedItem, EngineEvent, ItemCompleted, PipelineError,
    RenderedImage, RunId, SavedImage,
};
