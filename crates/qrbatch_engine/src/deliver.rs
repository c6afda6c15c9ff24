use std::borrow::Cow;
use std::path::{Path, PathBuf};

use arboard::{Clipboard, ImageData};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// File-save boundary: hands a finished blob to the user under a suggested name.
pub trait FileSaver: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DeliveryError>;
}

/// Saves into a fixed output directory, never leaving partial files behind.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    writer: AtomicFileWriter,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DeliveryError> {
        Ok(self.writer.write(filename, bytes)?)
    }
}

/// Clipboard boundary: receives one image as tightly packed RGBA rows.
pub trait ImageClipboard: Send + Sync {
    fn set_image(&self, width: u32, height: u32, rgba: &[u8]) -> Result<(), DeliveryError>;
}

/// The desktop clipboard. A handle is opened per copy; on Linux, dropping it
/// hands the image over to the clipboard manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ImageClipboard for SystemClipboard {
    fn set_image(&self, width: u32, height: u32, rgba: &[u8]) -> Result<(), DeliveryError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| DeliveryError::Clipboard(err.to_string()))?;
        clipboard
            .set_image(ImageData {
                width: width as usize,
                height: height as usize,
                bytes: Cow::Borrowed(rgba),
            })
            .map_err(|err| DeliveryError::Clipboard(err.to_string()))
    }
}
