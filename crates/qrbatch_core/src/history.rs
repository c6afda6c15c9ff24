use serde::{Deserialize, Serialize};

use crate::options::{ErrorLevel, QrOptions, MAX_HISTORY_ITEMS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Creation time in milliseconds, bumped to stay unique within a log.
    pub id: u64,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub text: String,
    pub size: u32,
    pub fg_color: String,
    pub bg_color: String,
    pub error_level: ErrorLevel,
}

impl HistoryEntry {
    pub fn options(&self) -> QrOptions {
        QrOptions {
            text: self.text.clone(),
            size: self.size,
            fg_color: self.fg_color.clone(),
            bg_color: self.bg_color.clone(),
            error_level: self.error_level,
        }
    }
}

/// Most-recent-first record of past generations, capped at 20 entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps entries that are already newest-first, dropping any beyond the cap.
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(MAX_HISTORY_ITEMS);
        Self { entries }
    }

    /// Prepends a new entry and evicts the oldest ones beyond the cap.
    pub fn record(&mut self, options: QrOptions, now_ms: u64, timestamp: String) -> &HistoryEntry {
        let id = match self.entries.first() {
            Some(newest) if newest.id >= now_ms => newest.id + 1,
            _ => now_ms,
        };
        self.entries.insert(
            0,
            HistoryEntry {
                id,
                timestamp,
                text: options.text,
                size: options.size,
                fg_color: options.fg_color,
                bg_color: options.bg_color,
                error_level: options.error_level,
            },
        );
        self.entries.truncate(MAX_HISTORY_ITEMS);
        &self.entries[0]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn find(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(text: &str) -> QrOptions {
        QrOptions {
            text: text.to_string(),
            ..QrOptions::default()
        }
    }

    #[test]
    fn newest_entry_is_first_and_log_is_capped() {
        let mut log = HistoryLog::new();
        for i in 0..25u64 {
            log.record(options(&format!("item {i}")), 1_000 + i, format!("t{i}"));
            assert!(log.len() <= MAX_HISTORY_ITEMS);
            assert_eq!(log.newest().unwrap().text, format!("item {i}"));
        }
        assert_eq!(log.len(), 20);
        assert_eq!(log.entries().last().unwrap().text, "item 5");
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut log = HistoryLog::new();
        let a = log.record(options("a"), 500, "t".into()).id;
        let b = log.record(options("b"), 500, "t".into()).id;
        let c = log.record(options("c"), 499, "t".into()).id;
        assert_eq!((a, b, c), (500, 501, 502));
        assert_eq!(log.find(501).unwrap().text, "b");
    }

    #[test]
    fn entries_serialize_with_camel_case_keys() {
        let mut log = HistoryLog::new();
        log.record(options("hello"), 7, "2024-01-01T00:00:00Z".into());
        let json = serde_json::to_string(log.entries()).unwrap();
        assert!(json.contains("\"fgColor\":\"#000000\""));
        assert!(json.contains("\"errorLevel\":\"M\""));
        let back: Vec<HistoryEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].options(), options("hello"));
    }
}
