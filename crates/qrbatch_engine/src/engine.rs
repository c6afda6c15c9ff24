use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use qrbatch_core::{BatchPhase, BatchRequest, ErrorLevel, OutputFormat, QrOptions};
use qrbatch_logging::{qr_debug, qr_error, qr_info, qr_warn};
use tokio_util::sync::CancellationToken;

use crate::deliver::{DirectorySaver, FileSaver, ImageClipboard, SystemClipboard};
use crate::encode::{EncodingError, QrCodeEncoder, QrEncoder, RenderOptions};
use crate::filename::{batch_archive_filename, single_download_filename};
use crate::pipeline::BatchRun;
use crate::progress::{ChannelProgressSink, ProgressSink};
use crate::store::StateStore;
use crate::types::{BatchOutcome, EngineEvent, PipelineError, RenderedImage, RunId, SavedImage};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub output_dir: PathBuf,
    /// Source of archive/download timestamps and history ids.
    pub now_utc: Clock,
    pub clipboard: Arc<dyn ImageClipboard>,
}

impl EngineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            now_utc: Arc::new(Utc::now),
            clipboard: Arc::new(SystemClipboard),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.now_utc = clock;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ImageClipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }
}

/// Synchronous batch/single-item operations over injected capabilities.
#[derive(Clone)]
pub struct Engine {
    encoder: Arc<dyn QrEncoder>,
    saver: Arc<dyn FileSaver>,
    clipboard: Arc<dyn ImageClipboard>,
    store: Arc<StateStore>,
    now_utc: Clock,
}

impl Engine {
    pub fn new(config: EngineConfig, store: Arc<StateStore>) -> Self {
        Self {
            encoder: Arc::new(QrCodeEncoder::default()),
            saver: Arc::new(DirectorySaver::new(config.output_dir)),
            clipboard: config.clipboard,
            store,
            now_utc: config.now_utc,
        }
    }

    pub fn with_parts(
        encoder: Arc<dyn QrEncoder>,
        saver: Arc<dyn FileSaver>,
        store: Arc<StateStore>,
        now_utc: Clock,
    ) -> Self {
        Self {
            encoder,
            saver,
            clipboard: Arc::new(SystemClipboard),
            store,
            now_utc,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ImageClipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Parses raw batch text and runs it; rejected input never reaches the encoder.
    pub fn run_batch_text(
        &self,
        raw: &str,
        size: u32,
        error_level: ErrorLevel,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
        run_id: RunId,
    ) -> Result<BatchOutcome, PipelineError> {
        let mut phases = PhaseTracker::new(sink, run_id);
        phases.advance(BatchPhase::Parsing);
        let request = match BatchRequest::from_raw(raw, size, error_level) {
            Ok(request) => request,
            Err(err) => {
                qr_info!("Batch {} rejected: {}", run_id, err);
                phases.advance(BatchPhase::Rejected);
                return Err(err.into());
            }
        };
        self.run_phases(&request, cancel, &mut phases)
    }

    /// Runs an already validated request through encode, archive and delivery.
    pub fn run_batch(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
        run_id: RunId,
    ) -> Result<BatchOutcome, PipelineError> {
        let mut phases = PhaseTracker::new(sink, run_id);
        phases.advance(BatchPhase::Parsing);
        self.run_phases(request, cancel, &mut phases)
    }

    fn run_phases(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
        phases: &mut PhaseTracker<'_>,
    ) -> Result<BatchOutcome, PipelineError> {
        let result = self.execute(request, cancel, phases);
        match &result {
            Ok(outcome) => {
                phases.advance(BatchPhase::Done);
                qr_info!(
                    "Batch {} saved {} codes to {}",
                    phases.run_id,
                    outcome.item_count,
                    outcome.archive_path.display()
                );
            }
            Err(err) => {
                phases.advance(BatchPhase::Aborted);
                qr_warn!("Batch {} aborted: {}", phases.run_id, err);
            }
        }
        result
    }

    fn execute(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
        phases: &mut PhaseTracker<'_>,
    ) -> Result<BatchOutcome, PipelineError> {
        phases.advance(BatchPhase::Encoding);
        let mut run = BatchRun::new(self.encoder.as_ref(), request, cancel.clone());
        for completed in run.by_ref() {
            let item = completed?;
            phases.sink.emit(EngineEvent::ItemCompleted {
                run_id: phases.run_id,
                item,
            });
        }

        phases.advance(BatchPhase::Archiving);
        let now = (self.now_utc)();
        let archive = run.finish(batch_archive_filename(now))?;

        phases.advance(BatchPhase::Delivering);
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                completed: request.len(),
                total: request.len(),
            });
        }
        let archive_path = self.saver.save(&archive.suggested_filename, &archive.blob)?;

        // The archive is on disk; from here on the run counts as done.
        let drafts: Vec<QrOptions> = request
            .entries()
            .iter()
            .map(|text| QrOptions::for_batch_item(text.clone(), request.size(), request.error_level()))
            .collect();
        let (history, history_warning) = match self.store.append_history(&drafts, now) {
            Ok(log) => (log.into_entries(), None),
            Err(err) => {
                qr_error!("Batch {} history update failed: {}", phases.run_id, err);
                (self.store.history().into_entries(), Some(err.to_string()))
            }
        };

        Ok(BatchOutcome {
            archive_path,
            item_count: request.len(),
            history,
            history_warning,
        })
    }

    /// Renders one code in the requested format without touching disk.
    pub fn render(
        &self,
        options: &QrOptions,
        format: OutputFormat,
    ) -> Result<RenderedImage, EncodingError> {
        let render = RenderOptions::from_options(options);
        let bytes = match format {
            OutputFormat::Png => self.encoder.encode_png(&options.text, &render)?,
            OutputFormat::Svg => Bytes::from(self.encoder.encode_svg(&options.text, &render)?),
        };
        qr_debug!("Rendered {} preview of {} bytes", format, bytes.len());
        Ok(RenderedImage { format, bytes })
    }

    /// Renders and saves one code as `qrcode-<millis>.<ext>`.
    pub fn save_single(
        &self,
        options: &QrOptions,
        format: OutputFormat,
    ) -> Result<SavedImage, PipelineError> {
        let image = self
            .render(options, format)
            .map_err(|source| PipelineError::Encoding { index: 1, source })?;
        let filename = single_download_filename((self.now_utc)(), format);
        let path = self.saver.save(&filename, &image.bytes)?;
        qr_info!("Saved {} ({} bytes)", path.display(), image.bytes.len());
        Ok(SavedImage {
            path,
            byte_len: image.bytes.len(),
        })
    }

    /// Renders one code as PNG and places the decoded pixels on the clipboard.
    pub fn copy_image(&self, options: &QrOptions) -> Result<(), PipelineError> {
        let encoding = |source: EncodingError| PipelineError::Encoding { index: 1, source };
        let png = self.render(options, OutputFormat::Png).map_err(encoding)?;
        let pixels = image::load_from_memory_with_format(&png.bytes, image::ImageFormat::Png)
            .map_err(|err| encoding(EncodingError::Raster(err.to_string())))?
            .to_rgba8();
        self.clipboard
            .set_image(pixels.width(), pixels.height(), pixels.as_raw())?;
        qr_info!("Copied {}x{} image to the clipboard", pixels.width(), pixels.height());
        Ok(())
    }
}

/// Emits `PhaseChanged` for every legal transition of one run.
struct PhaseTracker<'a> {
    sink: &'a dyn ProgressSink,
    run_id: RunId,
    phase: BatchPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(sink: &'a dyn ProgressSink, run_id: RunId) -> Self {
        Self {
            sink,
            run_id,
            phase: BatchPhase::Idle,
        }
    }

    fn advance(&mut self, next: BatchPhase) {
        if !self.phase.can_transition_to(next) {
            qr_warn!(
                "Batch {} ignoring phase change {:?} -> {:?}",
                self.run_id,
                self.phase,
                next
            );
            return;
        }
        self.phase = next;
        self.sink.emit(EngineEvent::PhaseChanged {
            run_id: self.run_id,
            phase: next,
        });
    }
}

enum EngineCommand {
    RunBatch {
        run_id: RunId,
        request: BatchRequest,
        cancel: CancellationToken,
    },
    RenderPreview {
        options: QrOptions,
        format: OutputFormat,
    },
    SaveSingle {
        options: QrOptions,
        format: OutputFormat,
    },
    CopyImage {
        options: QrOptions,
    },
}

/// Runs engine work on a background thread and reports back over a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    active: Mutex<Option<(RunId, CancellationToken)>>,
    next_run_id: Mutex<RunId>,
}

impl EngineHandle {
    pub fn new(engine: Engine) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&engine, command, &event_tx);
            }
            qr_debug!("Engine worker stopped");
        });

        Self {
            cmd_tx,
            event_rx,
            active: Mutex::new(None),
            next_run_id: Mutex::new(1),
        }
    }

    /// Queues a batch run and returns its id; `cancel` stops it between items.
    pub fn run_batch(&self, request: BatchRequest) -> RunId {
        let run_id = {
            let mut next = self.next_run_id.lock().unwrap_or_else(PoisonError::into_inner);
            let id = *next;
            *next += 1;
            id
        };
        let cancel = CancellationToken::new();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((run_id, cancel.clone()));
        let _ = self.cmd_tx.send(EngineCommand::RunBatch {
            run_id,
            request,
            cancel,
        });
        run_id
    }

    /// Cancels the most recently queued batch run, if any.
    pub fn cancel(&self) {
        if let Some((run_id, token)) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            qr_info!("Cancelling batch {}", run_id);
            token.cancel();
        }
    }

    pub fn render_preview(&self, options: QrOptions, format: OutputFormat) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::RenderPreview { options, format });
    }

    pub fn save_single(&self, options: QrOptions, format: OutputFormat) {
        let _ = self.cmd_tx.send(EngineCommand::SaveSingle { options, format });
    }

    pub fn copy_image(&self, options: QrOptions) {
        let _ = self.cmd_tx.send(EngineCommand::CopyImage { options });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn handle_command(engine: &Engine, command: EngineCommand, event_tx: &mpsc::Sender<EngineEvent>) {
    match command {
        EngineCommand::RunBatch {
            run_id,
            request,
            cancel,
        } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = engine
                .run_batch(&request, &cancel, &sink, run_id)
                .map(Into::into)
                .map_err(|err| err.to_failure());
            let _ = event_tx.send(EngineEvent::BatchFinished { run_id, result });
        }
        EngineCommand::RenderPreview { options, format } => {
            let result = engine.render(&options, format).map_err(|e| e.to_string());
            let _ = event_tx.send(EngineEvent::PreviewRendered { options, result });
        }
        EngineCommand::SaveSingle { options, format } => {
            let result = engine
                .save_single(&options, format)
                .map_err(|e| e.to_string());
            let _ = event_tx.send(EngineEvent::SingleSaved { options, result });
        }
        EngineCommand::CopyImage { options } => {
            let result = engine.copy_image(&options).map_err(|e| e.to_string());
            let _ = event_tx.send(EngineEvent::ImageCopied { result });
        }
    }
}
