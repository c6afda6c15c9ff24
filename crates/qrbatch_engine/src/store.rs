//! Persistent preferences and history behind an injected key-value store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use qrbatch_core::{HistoryEntry, HistoryLog, QrOptions, Theme};
use qrbatch_logging::{qr_info, qr_warn};
use thiserror::Error;

pub const THEME_KEY: &str = "color-scheme";
pub const HISTORY_KEY: &str = "qr-history";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// String key-value storage that survives across sessions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Theme and history service; every read-modify-write runs under one lock.
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Stored theme, or light when missing or unreadable.
    pub fn theme(&self) -> Theme {
        match self.kv.get(THEME_KEY) {
            Ok(Some(value)) => value.parse().unwrap_or_else(|err| {
                qr_warn!("Ignoring stored theme {:?}: {}", value, err);
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(err) => {
                qr_warn!("Failed to read theme: {}", err);
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.kv.set(THEME_KEY, theme.as_str())
    }

    /// Stored history, or an empty log when missing or unreadable.
    pub fn history(&self) -> HistoryLog {
        self.read_history().unwrap_or_else(|err| {
            qr_warn!("Ignoring unreadable history: {}", err);
            HistoryLog::new()
        })
    }

    /// Appends `drafts` in order (the last one ends up newest) and returns the capped log.
    pub fn append_history(
        &self,
        drafts: &[QrOptions],
        now: DateTime<Utc>,
    ) -> Result<HistoryLog, StoreError> {
        let _guard = self.lock();
        let mut log = self.history();
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        for draft in drafts {
            log.record(draft.clone(), now_ms, timestamp.clone());
        }
        self.write_history(log.entries())?;
        qr_info!(
            "Appended {} history entries ({} stored)",
            drafts.len(),
            log.len()
        );
        Ok(log)
    }

    pub fn clear_history(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.kv.remove(HISTORY_KEY)
    }

    fn read_history(&self) -> Result<HistoryLog, StoreError> {
        match self.kv.get(HISTORY_KEY)? {
            Some(json) => {
                let entries: Vec<HistoryEntry> = serde_json::from_str(&json)?;
                Ok(HistoryLog::from_entries(entries))
            }
            None => Ok(HistoryLog::new()),
        }
    }

    fn write_history(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries)?;
        self.kv.set(HISTORY_KEY, &json)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::TimeZone;
    use qrbatch_core::{ErrorLevel, MAX_HISTORY_ITEMS};

    use super::*;

    fn store() -> (Arc<MemoryStore>, StateStore) {
        let kv = Arc::new(MemoryStore::new());
        let state = StateStore::new(kv.clone());
        (kv, state)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn theme_defaults_to_light_and_persists() {
        let (kv, state) = store();
        assert_eq!(state.theme(), Theme::Light);
        state.set_theme(Theme::Dark).unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(state.theme(), Theme::Dark);

        kv.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(state.theme(), Theme::Light);
    }

    #[test]
    fn append_keeps_newest_first_and_caps() {
        let (_kv, state) = store();
        let drafts: Vec<_> = (0..25)
            .map(|i| QrOptions::for_batch_item(format!("item {i}"), 256, ErrorLevel::M))
            .collect();
        let log = state.append_history(&drafts, at(1_000)).unwrap();
        assert_eq!(log.len(), MAX_HISTORY_ITEMS);
        assert_eq!(log.newest().unwrap().text, "item 24");
        assert_eq!(state.history(), log);
        assert_eq!(log.newest().unwrap().timestamp, "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn corrupt_history_is_treated_as_empty() {
        let (kv, state) = store();
        kv.set(HISTORY_KEY, "{not json").unwrap();
        assert!(state.history().is_empty());

        let log = state
            .append_history(&[QrOptions::for_batch_item("a", 256, ErrorLevel::L)], at(5))
            .unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn concurrent_appends_do_not_lose_entries() {
        let (_kv, state) = store();
        let state = Arc::new(state);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = state.clone();
                thread::spawn(move || {
                    let draft = QrOptions::for_batch_item(format!("t{t}"), 256, ErrorLevel::M);
                    state.append_history(&[draft], at(42)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let log = state.history();
        assert_eq!(log.len(), 8);
        let mut ids: Vec<_> = log.entries().iter().map(|e| e.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn clear_removes_stored_history() {
        let (kv, state) = store();
        state
            .append_history(&[QrOptions::for_batch_item("a", 256, ErrorLevel::L)], at(5))
            .unwrap();
        state.clear_history().unwrap();
        assert!(kv.get(HISTORY_KEY).unwrap().is_none());
        assert!(state.history().is_empty());
    }
}
