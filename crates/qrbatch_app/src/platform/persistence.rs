use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use qrbatch_engine::{AtomicFileWriter, KeyValueStore, StoreError};
use qrbatch_logging::{qr_debug, qr_warn};
use serde::{Deserialize, Serialize};

pub(crate) const STATE_FILENAME: &str = ".qrbatch_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    values: BTreeMap<String, String>,
}

/// Key-value store kept in one RON document inside the data directory.
///
/// The whole document is rewritten atomically on every change.
pub(crate) struct FileStore {
    writer: AtomicFileWriter,
    state: Mutex<PersistedState>,
}

impl FileStore {
    pub(crate) fn open(data_dir: &Path) -> Self {
        let state = load_state(&data_dir.join(STATE_FILENAME));
        Self {
            writer: AtomicFileWriter::new(PathBuf::from(data_dir)),
            state: Mutex::new(state),
        }
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        if !change(&mut next.values) {
            return Ok(());
        }
        let content = ron::ser::to_string_pretty(&next, ron::ser::PrettyConfig::new())
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        self.writer
            .write(STATE_FILENAME, content)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        *state = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| values.remove(key).is_some())
    }
}

fn load_state(path: &Path) -> PersistedState {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PersistedState::default();
        }
        Err(err) => {
            qr_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return PersistedState::default();
        }
    };

    match ron::from_str(&content) {
        Ok(state) => {
            qr_debug!("Loaded persisted state from {:?}", path);
            state
        }
        Err(err) => {
            qr_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            PersistedState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qrbatch_core::{ErrorLevel, QrOptions, Theme};
    use qrbatch_engine::StateStore;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn values_survive_reopening() {
        let temp = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp.path());
            store.set("color-scheme", "dark").unwrap();
            store.set("qr-history", "[]").unwrap();
            store.remove("qr-history").unwrap();
        }
        let reopened = FileStore::open(temp.path());
        assert_eq!(reopened.get("color-scheme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get("qr-history").unwrap(), None);
    }

    #[test]
    fn unreadable_file_starts_empty_and_is_replaced() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STATE_FILENAME), "not ron at all (").unwrap();

        let store = FileStore::open(temp.path());
        assert_eq!(store.get("color-scheme").unwrap(), None);
        store.set("color-scheme", "light").unwrap();

        let text = fs::read_to_string(temp.path().join(STATE_FILENAME)).unwrap();
        assert!(text.contains("color-scheme"));
    }

    #[test]
    fn backs_the_state_store() {
        let temp = TempDir::new().unwrap();
        let state = StateStore::new(Arc::new(FileStore::open(temp.path())));
        state.set_theme(Theme::Dark).unwrap();
        state
            .append_history(
                &[QrOptions::for_batch_item("saved", 384, ErrorLevel::H)],
                chrono::Utc::now(),
            )
            .unwrap();

        let reopened = StateStore::new(Arc::new(FileStore::open(temp.path())));
        assert_eq!(reopened.theme(), Theme::Dark);
        let history = reopened.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].text, "saved");
        assert_eq!(history.entries()[0].size, 384);
    }
}
