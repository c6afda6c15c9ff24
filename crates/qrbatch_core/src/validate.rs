use thiserror::Error;

use crate::options::{MAX_TEXT_LENGTH, SIZE_MAX, SIZE_MIN, SIZE_STEP};

/// Bad input shape, reported before any rendering work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter at least one line of text")]
    Empty,
    #[error("too many lines ({count}), maximum is {max}")]
    TooMany { count: usize, max: usize },
    #[error("text is too long ({len} characters, max {max})")]
    TooLong { len: usize, max: usize },
    #[error("size {0}px must be between 128 and 512 in steps of 32")]
    Size(u32),
    #[error("invalid color {0:?}, expected #rrggbb")]
    Color(String),
    #[error("unknown error correction level {0:?}")]
    ErrorLevel(String),
    #[error("unknown output format {0:?}")]
    Format(String),
    #[error("unknown theme {0:?}")]
    Theme(String),
}

impl ValidationError {
    /// Short stable code, e.g. `"empty"` or `"too-many"`.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Empty => "empty",
            ValidationError::TooMany { .. } => "too-many",
            ValidationError::TooLong { .. } => "too-long",
            ValidationError::Size(_) => "size",
            ValidationError::Color(_) => "color",
            ValidationError::ErrorLevel(_) => "error-level",
            ValidationError::Format(_) => "format",
            ValidationError::Theme(_) => "theme",
        }
    }
}

/// Text for a single code: non-blank and at most 2000 characters.
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LENGTH {
        return Err(ValidationError::TooLong {
            len,
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_size(size: u32) -> Result<(), ValidationError> {
    if !(SIZE_MIN..=SIZE_MAX).contains(&size) || (size - SIZE_MIN) % SIZE_STEP != 0 {
        return Err(ValidationError::Size(size));
    }
    Ok(())
}

/// Parses `#rrggbb` (case-insensitive) into RGB components.
pub fn parse_hex_color(color: &str) -> Result<[u8; 3], ValidationError> {
    let invalid = || ValidationError::Color(color.to_string());
    let hex = color.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

pub fn is_valid_hex_color(color: &str) -> bool {
    parse_hex_color(color).is_ok()
}

fn relative_luminance([r, g, b]: [u8; 3]) -> f64 {
    let linear = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// WCAG contrast ratio between two colors, in `1.0..=21.0`.
pub fn contrast_ratio(fg: [u8; 3], bg: [u8; 3]) -> f64 {
    let l1 = relative_luminance(fg);
    let l2 = relative_luminance(bg);
    (l1.max(l2) + 0.05) / (l1.min(l2) + 0.05)
}

/// At least 3:1, the WCAG AA threshold for large elements.
pub fn has_good_contrast(fg: [u8; 3], bg: [u8; 3]) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_must_be_non_blank_and_bounded() {
        assert_eq!(validate_text("   "), Err(ValidationError::Empty));
        assert!(validate_text("hello").is_ok());
        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert_eq!(validate_text(&long).unwrap_err().code(), "too-long");
        assert!(validate_text(&"x".repeat(MAX_TEXT_LENGTH)).is_ok());
    }

    #[test]
    fn size_follows_slider_steps() {
        assert!(validate_size(128).is_ok());
        assert!(validate_size(256).is_ok());
        assert!(validate_size(512).is_ok());
        assert_eq!(validate_size(100), Err(ValidationError::Size(100)));
        assert_eq!(validate_size(130), Err(ValidationError::Size(130)));
        assert_eq!(validate_size(544), Err(ValidationError::Size(544)));
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#228BE6").unwrap(), [0x22, 0x8b, 0xe6]);
        assert!(!is_valid_hex_color("228be6"));
        assert!(!is_valid_hex_color("#fff"));
        assert!(!is_valid_hex_color("#gggggg"));
    }

    #[test]
    fn black_on_white_has_maximum_contrast() {
        let ratio = contrast_ratio([0, 0, 0], [255, 255, 255]);
        assert!((ratio - 21.0).abs() < 1e-9);
        assert!(has_good_contrast([0, 0, 0], [255, 255, 255]));
        assert!(!has_good_contrast([0xfa, 0xb0, 0x05], [0xff, 0xff, 0xff]));
    }
}
