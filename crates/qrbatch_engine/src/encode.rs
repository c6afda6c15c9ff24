//! QR rendering on top of the `qrcode` and `image` crates.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};
use qrbatch_core::{parse_hex_color, ErrorLevel, QrOptions, ValidationError};
use thiserror::Error;

/// Quiet zone around the symbol, in modules.
pub const DEFAULT_MARGIN: u32 = 2;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("text of {len} bytes exceeds QR capacity at error level {level}")]
    CapacityExceeded { len: usize, level: ErrorLevel },
    #[error("encoder rejected input: {0}")]
    Rejected(String),
    #[error(transparent)]
    Color(#[from] ValidationError),
    #[error("raster encoding failed: {0}")]
    Raster(String),
}

/// Visual parameters shared by every code in one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub size: u32,
    pub error_level: ErrorLevel,
    pub foreground: String,
    pub background: String,
}

impl RenderOptions {
    pub fn from_options(options: &QrOptions) -> Self {
        Self {
            size: options.size,
            error_level: options.error_level,
            foreground: options.fg_color.clone(),
            background: options.bg_color.clone(),
        }
    }

    /// Batch items always render black on white.
    pub fn batch(size: u32, error_level: ErrorLevel) -> Self {
        Self::from_options(&QrOptions::for_batch_item(String::new(), size, error_level))
    }
}

/// External encoding capability: text + options in, deterministic image out.
pub trait QrEncoder: Send + Sync {
    fn encode_png(&self, text: &str, options: &RenderOptions) -> Result<Bytes, EncodingError>;

    fn encode_svg(&self, text: &str, options: &RenderOptions) -> Result<String, EncodingError>;
}

#[derive(Debug, Clone, Copy)]
pub struct QrCodeEncoder {
    margin: u32,
}

impl Default for QrCodeEncoder {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl QrEncoder for QrCodeEncoder {
    fn encode_png(&self, text: &str, options: &RenderOptions) -> Result<Bytes, EncodingError> {
        let fg = Rgb(parse_hex_color(&options.foreground)?);
        let bg = Rgb(parse_hex_color(&options.background)?);
        let code = build_code(text, options.error_level)?;
        let bitmap = rasterize(&code, self.margin, options.size, fg, bg);

        let mut buf = Vec::new();
        bitmap
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| EncodingError::Raster(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    fn encode_svg(&self, text: &str, options: &RenderOptions) -> Result<String, EncodingError> {
        parse_hex_color(&options.foreground)?;
        parse_hex_color(&options.background)?;
        let code = build_code(text, options.error_level)?;
        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(options.size, options.size)
            .dark_color(svg::Color(&options.foreground))
            .light_color(svg::Color(&options.background))
            .build())
    }
}

fn build_code(text: &str, level: ErrorLevel) -> Result<QrCode, EncodingError> {
    QrCode::with_error_correction_level(text.as_bytes(), ec_level(level)).map_err(|e| match e {
        QrError::DataTooLong => EncodingError::CapacityExceeded {
            len: text.len(),
            level,
        },
        other => EncodingError::Rejected(other.to_string()),
    })
}

fn ec_level(level: ErrorLevel) -> EcLevel {
    match level {
        ErrorLevel::L => EcLevel::L,
        ErrorLevel::M => EcLevel::M,
        ErrorLevel::Q => EcLevel::Q,
        ErrorLevel::H => EcLevel::H,
    }
}

/// Draws modules at an integer scale, then brings the bitmap to exactly
/// `size`×`size` when the symbol fits. Larger symbols keep one pixel per module.
fn rasterize(code: &QrCode, margin: u32, size: u32, fg: Rgb<u8>, bg: Rgb<u8>) -> RgbImage {
    let modules = code.width() as u32;
    let total = modules + 2 * margin;
    let scale = (size / total).max(1);
    let mut img = RgbImage::from_pixel(total * scale, total * scale, bg);

    for (i, color) in code.to_colors().iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let x = (i as u32 % modules + margin) * scale;
        let y = (i as u32 / modules + margin) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x + dx, y + dy, fg);
            }
        }
    }

    if img.width() < size {
        imageops::resize(&img, size, size, FilterType::Nearest)
    } else {
        img
    }
}
