use log::{info, warn};
use thiserror::Error;

use super::{KeyValueStore, StoreError};
use crate::types::{SessionRecord, TimestampedSample};
use crate::utils::session_name;

pub const SESSION_KEY_PREFIX: &str = "session_";
pub const SESSION_INDEX_KEY: &str = "savedSessions";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("No recorded samples to save")]
    NothingToSave,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Free-recording sessions persisted as `session_{timestamp}` entries plus
/// a `savedSessions` index of their names.
pub struct SessionHistory<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> SessionHistory<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn save(
        &self,
        name: Option<&str>,
        samples: &[TimestampedSample],
        max_acceleration: f64,
        now_ms: i64,
    ) -> Result<SessionRecord, HistoryError> {
        if samples.is_empty() {
            return Err(HistoryError::NothingToSave);
        }

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => session_name(now_ms),
        };
        let record = SessionRecord::new(name, samples.to_vec(), max_acceleration, now_ms);

        let key = self.unused_key(now_ms)?;
        self.store.set(&key, &serde_json::to_string(&record)?)?;

        let mut names = self.list()?;
        names.push(record.name.clone());
        self.store.set(SESSION_INDEX_KEY, &serde_json::to_string(&names)?)?;

        info!("Saved session '{}' with {} samples under {}", record.name, record.sample_count(), key);
        Ok(record)
    }

    /// Saved session names in save order. A corrupt index reads as empty.
    pub fn list(&self) -> Result<Vec<String>, HistoryError> {
        let Some(raw) = self.store.get(SESSION_INDEX_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => Ok(names),
            Err(e) => {
                warn!("Ignoring corrupt session index: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Find a session by name among every stored session entry
    pub fn load(&self, name: &str) -> Result<Option<SessionRecord>, HistoryError> {
        Ok(self.records()?.into_iter().find(|record| record.name == name))
    }

    /// Remove the newest session called `name` and one index entry for it.
    /// Returns `false` if no such session is stored.
    pub fn delete(&self, name: &str) -> Result<bool, HistoryError> {
        let Some((key, _)) = self.entries()?.into_iter().find(|(_, record)| record.name == name) else {
            return Ok(false);
        };
        self.store.delete(&key)?;

        let mut names = self.list()?;
        if let Some(position) = names.iter().rposition(|n| n == name) {
            names.remove(position);
        }
        self.store.set(SESSION_INDEX_KEY, &serde_json::to_string(&names)?)?;

        info!("Deleted session '{}' ({})", name, key);
        Ok(true)
    }

    /// Every readable session entry, newest first. Corrupt entries are skipped.
    pub fn records(&self) -> Result<Vec<SessionRecord>, HistoryError> {
        Ok(self.entries()?.into_iter().map(|(_, record)| record).collect())
    }

    /// `session_{now_ms}`, or `session_{now_ms}_{n}` when saves share a millisecond
    fn unused_key(&self, now_ms: i64) -> Result<String, HistoryError> {
        let base = format!("{}{}", SESSION_KEY_PREFIX, now_ms);
        if self.store.get(&base)?.is_none() {
            return Ok(base);
        }
        let mut suffix = 1;
        loop {
            let key = format!("{}_{}", base, suffix);
            if self.store.get(&key)?.is_none() {
                return Ok(key);
            }
            suffix += 1;
        }
    }

    fn entries(&self) -> Result<Vec<(String, SessionRecord)>, HistoryError> {
        let mut records = Vec::new();

        for key in self.store.list_keys()? {
            if !key.starts_with(SESSION_KEY_PREFIX) {
                continue;
            }
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) => records.push((key, record)),
                Err(e) => warn!("Skipping corrupt session entry {}: {}", key, e),
            }
        }

        records.sort_by(|(_, a), (_, b)| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DuckDbStore, MemoryStore};

    fn samples(count: usize) -> Vec<TimestampedSample> {
        (0..count)
            .map(|i| TimestampedSample::new(0.0, i as f64, 9.8, 1_000 + i as i64))
            .collect()
    }

    #[test]
    fn empty_recording_is_rejected() {
        let store = MemoryStore::new();
        let history = SessionHistory::new(&store);
        assert!(matches!(
            history.save(Some("x"), &[], 0.0, 1),
            Err(HistoryError::NothingToSave)
        ));
        assert!(store.list_keys().unwrap().is_empty());
    }

    #[test]
    fn save_list_and_load() {
        let store = MemoryStore::new();
        let history = SessionHistory::new(&store);

        history.save(Some("first"), &samples(3), 1.5, 100).unwrap();
        let second = history.save(None, &samples(2), 0.7, 200).unwrap();
        assert!(second.name.starts_with("Session "));

        assert_eq!(history.list().unwrap(), vec!["first".to_string(), second.name.clone()]);

        let loaded = history.load("first").unwrap().unwrap();
        assert_eq!(loaded.sample_count(), 3);
        assert_eq!(loaded.max_acceleration, 1.5);
        assert_eq!(loaded.raw_samples[2].vector.y, 2.0);

        assert_eq!(history.load(&second.name).unwrap().unwrap().timestamp, 200);
        assert!(history.load("missing").unwrap().is_none());
    }

    #[test]
    fn corrupt_entries_are_skipped() {
        let store = MemoryStore::new();
        let history = SessionHistory::new(&store);
        history.save(Some("good"), &samples(1), 0.2, 10).unwrap();
        store.set("session_5", "not json").unwrap();
        store.set(SESSION_INDEX_KEY, "{broken").unwrap();

        let records = history.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "good");
        assert!(history.list().unwrap().is_empty());
    }

    #[test]
    fn saves_in_the_same_millisecond_keep_both_sessions() {
        let store = MemoryStore::new();
        let history = SessionHistory::new(&store);
        history.save(Some("a"), &samples(1), 0.1, 500).unwrap();
        history.save(Some("b"), &samples(2), 0.2, 500).unwrap();

        assert_eq!(history.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(history.load("a").unwrap().unwrap().sample_count(), 1);
        assert_eq!(history.load("b").unwrap().unwrap().sample_count(), 2);
        assert_eq!(history.records().unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_entry_and_index_name() {
        let store = MemoryStore::new();
        let history = SessionHistory::new(&store);
        history.save(Some("keep"), &samples(1), 0.1, 10).unwrap();
        history.save(Some("drop"), &samples(1), 0.1, 20).unwrap();

        assert!(history.delete("drop").unwrap());
        assert!(!history.delete("drop").unwrap());

        assert_eq!(history.list().unwrap(), vec!["keep".to_string()]);
        assert!(history.load("drop").unwrap().is_none());
        assert!(history.load("keep").unwrap().is_some());
    }

    #[test]
    fn sessions_persist_in_duckdb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = DuckDbStore::open(&path).unwrap();
            SessionHistory::new(&store).save(Some("swing"), &samples(4), 3.2, 42).unwrap();
        }

        let store = DuckDbStore::open(&path).unwrap();
        let history = SessionHistory::new(&store);
        let record = history.load("swing").unwrap().unwrap();
        assert_eq!(record.sample_count(), 4);
        assert_eq!(record.timestamp, 42);

        assert!(history.delete("swing").unwrap());
        assert!(history.load("swing").unwrap().is_none());
    }
}
