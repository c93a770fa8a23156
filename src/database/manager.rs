use std::fs;
use std::path::Path;

use duckdb::Connection;
use log::{debug, info};

use super::schema::StoreSchema;
use super::{KeyValueStore, StoreError};

/// `KeyValueStore` backed by a single DuckDB table
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        info!("Database connection established at: {}", db_path.display());

        StoreSchema::create_tables(&conn)?;
        let entries = StoreSchema::entry_count(&conn)?;
        info!("Key-value store holds {} entries", entries);

        Ok(Self { conn })
    }
}

impl KeyValueStore for DuckDbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| row.get::<_, String>(0))
        {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
            duckdb::params![key, value],
        )?;
        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let deleted = self.conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        debug!("Deleted {} ({} rows)", key, deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_and_get_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DuckDbStore::open(&dir.path().join("kv.db")).unwrap();
        assert_eq!(store.get("gravityOffset").unwrap(), None);

        store.set("gravityOffset", r#"{"x":0.0,"y":0.0,"z":9.8}"#).unwrap();
        store.set("gravityOffset", r#"{"x":0.1,"y":0.0,"z":9.7}"#).unwrap();

        assert_eq!(
            store.get("gravityOffset").unwrap().as_deref(),
            Some(r#"{"x":0.1,"y":0.0,"z":9.7}"#)
        );
        assert_eq!(store.list_keys().unwrap(), vec!["gravityOffset".to_string()]);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flail.db");

        {
            let store = DuckDbStore::open(&path).unwrap();
            store.set("b", "2").unwrap();
            store.set("a", "1").unwrap();
        }

        let store = DuckDbStore::open(&path).unwrap();
        assert_eq!(store.list_keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
