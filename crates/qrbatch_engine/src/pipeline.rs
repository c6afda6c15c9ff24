//! Sequential encode-and-archive loop of one batch run.
//!
//! [`BatchRun`] is a finite iterator of per-item completion events. Each
//! call to `next` encodes exactly one entry and adds it to the archive
//! before returning, so at most one raster buffer is alive at a time. After
//! the first error the iterator is exhausted and [`BatchRun::finish`]
//! refuses to produce an archive.

use qrbatch_core::{BatchProgress, BatchRequest};
use qrbatch_logging::{qr_debug, qr_warn};
use tokio_util::sync::CancellationToken;

use crate::archive::ArchiveAssembler;
use crate::encode::{QrEncoder, RenderOptions};
use crate::filename::archive_entry_name;
use crate::types::{ArchiveResult, EncodedItem, ItemCompleted, PipelineError};

pub struct BatchRun<'a> {
    encoder: &'a dyn QrEncoder,
    request: &'a BatchRequest,
    render: RenderOptions,
    archive: Option<ArchiveAssembler>,
    cancel: CancellationToken,
    completed: usize,
    failed: bool,
}

impl<'a> BatchRun<'a> {
    pub fn new(
        encoder: &'a dyn QrEncoder,
        request: &'a BatchRequest,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            encoder,
            request,
            render: RenderOptions::batch(request.size(), request.error_level()),
            archive: Some(ArchiveAssembler::new()),
            cancel,
            completed: 0,
            failed: false,
        }
    }

    pub fn progress(&self) -> BatchProgress {
        BatchProgress::new(self.completed, self.request.len())
    }

    /// Finalizes the archive once every item has been added.
    pub fn finish(mut self, suggested_filename: String) -> Result<ArchiveResult, PipelineError> {
        let total = self.request.len();
        if self.failed || self.completed != total {
            return Err(PipelineError::Incomplete {
                completed: self.completed,
                total,
            });
        }
        let archive = self.archive.take().ok_or(PipelineError::Incomplete {
            completed: self.completed,
            total,
        })?;
        Ok(archive.finish(suggested_filename)?)
    }

    fn abort(&mut self, err: PipelineError) -> Option<Result<ItemCompleted, PipelineError>> {
        qr_warn!(
            "batch aborted after {}/{} items: {}",
            self.completed,
            self.request.len(),
            err
        );
        self.failed = true;
        // Drop the partial archive right away.
        self.archive = None;
        Some(Err(err))
    }

    fn process(&mut self, index: usize) -> Result<ItemCompleted, PipelineError> {
        let text = &self.request.entries()[index];
        let image = self
            .encoder
            .encode_png(text, &self.render)
            .map_err(|source| PipelineError::Encoding {
                index: index + 1,
                source,
            })?;
        let item = EncodedItem {
            index,
            source_text: text.clone(),
            image,
            filename: archive_entry_name(index + 1, text),
        };
        let archive = self.archive.as_mut().ok_or(PipelineError::Incomplete {
            completed: self.completed,
            total: self.request.len(),
        })?;
        archive.add(&item)?;
        qr_debug!(
            "archived {} ({} bytes) from {:?}",
            item.filename,
            item.image.len(),
            item.source_text
        );
        Ok(ItemCompleted {
            index,
            filename: item.filename,
            progress: BatchProgress::new(index + 1, self.request.len()),
        })
    }
}

impl Iterator for BatchRun<'_> {
    type Item = Result<ItemCompleted, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.completed >= self.request.len() {
            return None;
        }
        if self.cancel.is_cancelled() {
            let err = PipelineError::Cancelled {
                completed: self.completed,
                total: self.request.len(),
            };
            return self.abort(err);
        }
        match self.process(self.completed) {
            Ok(done) => {
                self.completed += 1;
                Some(Ok(done))
            }
            Err(err) => self.abort(err),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.request.len() - self.completed))
        }
    }
}
