pub mod manager;
pub mod schema;
pub mod handlers;
pub mod client;
pub mod memory;
pub mod history;

pub use manager::DuckDbStore;
pub use handlers::run_store_handler;
pub use client::StoreHandle;
pub use memory::MemoryStore;
pub use history::{HistoryError, SessionHistory};

use std::time::Duration;

use thiserror::Error;

/// Store errors cross the store thread boundary, so they carry text, not sources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to prepare database location: {0}")]
    Io(String),

    #[error("Store thread is not running")]
    Disconnected,

    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Durable string key-value store. Values are JSON text written by the caller.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
