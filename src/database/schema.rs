use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct StoreSchema;

impl StoreSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key VARCHAR PRIMARY KEY,
                value VARCHAR NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        info!("kv_store table ready");
        Ok(())
    }

    pub fn entry_count(conn: &Connection) -> DuckResult<i64> {
        conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get::<_, i64>(0))
    }
}
