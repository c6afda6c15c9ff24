use chrono::{DateTime, Utc};
use qrbatch_core::OutputFormat;

/// Characters of source text that contribute to an archive entry name.
pub const ENTRY_PREFIX_CHARS: usize = 20;

/// Archive entry name: `qrcode_{index}_{sanitized}.png`, `index` is 1-based.
///
/// The index alone keeps names unique within one archive; identical
/// prefixes are not deduplicated further.
pub fn archive_entry_name(index: usize, text: &str) -> String {
    format!("qrcode_{index}_{}.png", sanitize_prefix(text))
}

/// First 20 characters, lowercased, anything outside `[a-z0-9]` replaced by `_`.
pub fn sanitize_prefix(text: &str) -> String {
    text.chars()
        .take(ENTRY_PREFIX_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `qrcodes_batch_{millis}.zip`
pub fn batch_archive_filename(now: DateTime<Utc>) -> String {
    format!("qrcodes_batch_{}.zip", now.timestamp_millis())
}

/// `qrcode-{millis}.{png|svg}`
pub fn single_download_filename(now: DateTime<Utc>, format: OutputFormat) -> String {
    format!("qrcode-{}.{}", now.timestamp_millis(), format.extension())
}
