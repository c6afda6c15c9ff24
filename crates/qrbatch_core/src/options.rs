use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const SIZE_MIN: u32 = 128;
pub const SIZE_MAX: u32 = 512;
pub const SIZE_STEP: u32 = 32;
pub const DEFAULT_SIZE: u32 = 256;

pub const MAX_TEXT_LENGTH: usize = 2000;
pub const MAX_BATCH_SIZE: usize = 100;
pub const MAX_HISTORY_ITEMS: usize = 20;

pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// QR error-correction level, trading capacity for damage resilience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorLevel {
    pub const ALL: [ErrorLevel; 4] = [ErrorLevel::L, ErrorLevel::M, ErrorLevel::Q, ErrorLevel::H];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorLevel::L => "L",
            ErrorLevel::M => "M",
            ErrorLevel::Q => "Q",
            ErrorLevel::H => "H",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorLevel::L => "Low (~7%)",
            ErrorLevel::M => "Medium (~15%)",
            ErrorLevel::Q => "Quartile (~25%)",
            ErrorLevel::H => "High (~30%)",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(ErrorLevel::L),
            "m" | "medium" => Ok(ErrorLevel::M),
            "q" | "quartile" => Ok(ErrorLevel::Q),
            "h" | "high" => Ok(ErrorLevel::H),
            _ => Err(ValidationError::ErrorLevel(s.to_string())),
        }
    }
}

/// Download format for a single code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// Raster image, best for digital use.
    #[default]
    Png,
    /// Vector image, best for print and scaling.
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => f.write_str("PNG"),
            OutputFormat::Svg => f.write_str("SVG"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(ValidationError::Format(s.to_string())),
        }
    }
}

/// Light/dark color scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ValidationError::Theme(s.to_string())),
        }
    }
}

/// Everything needed to render one code and to record it in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOptions {
    pub text: String,
    pub size: u32,
    pub fg_color: String,
    pub bg_color: String,
    pub error_level: ErrorLevel,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            size: DEFAULT_SIZE,
            fg_color: DEFAULT_FOREGROUND.to_string(),
            bg_color: DEFAULT_BACKGROUND.to_string(),
            error_level: ErrorLevel::default(),
        }
    }
}

impl QrOptions {
    /// Options used for every batch item: default colors, shared size and level.
    pub fn for_batch_item(text: impl Into<String>, size: u32, error_level: ErrorLevel) -> Self {
        Self {
            text: text.into(),
            size,
            error_level,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_level_parses_letters_and_names() {
        assert_eq!("h".parse::<ErrorLevel>().unwrap(), ErrorLevel::H);
        assert_eq!("Quartile".parse::<ErrorLevel>().unwrap(), ErrorLevel::Q);
        assert!("x".parse::<ErrorLevel>().is_err());
    }

    #[test]
    fn theme_toggles_back_and_forth() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn batch_item_options_use_default_colors() {
        let options = QrOptions::for_batch_item("abc", 320, ErrorLevel::Q);
        assert_eq!(options.fg_color, "#000000");
        assert_eq!(options.bg_color, "#ffffff");
        assert_eq!(options.size, 320);
    }
}
