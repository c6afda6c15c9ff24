use std::io::{self, Cursor, Write};

use bytes::Bytes;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::types::{ArchiveResult, EncodedItem};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Single in-memory zip accumulator for one batch run.
pub struct ArchiveAssembler {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entry_names: Vec<String>,
}

impl Default for ArchiveAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entry_names: Vec::new(),
        }
    }

    pub fn add(&mut self, item: &EncodedItem) -> Result<(), ArchiveError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(item.filename.as_str(), options)?;
        self.writer.write_all(&item.image)?;
        self.entry_names.push(item.filename.clone());
        Ok(())
    }

    /// Writes the central directory and hands back the finished blob.
    pub fn finish(self, suggested_filename: String) -> Result<ArchiveResult, ArchiveError> {
        let cursor = self.writer.finish()?;
        Ok(ArchiveResult {
            blob: Bytes::from(cursor.into_inner()),
            suggested_filename,
            entry_names: self.entry_names,
        })
    }
}
