//! Relational SQLite backend.
//!
//! # Responsibility
//! - Persist one row per context plus key-value metadata rows for the
//!   active pointer and the navigation stack.
//! - Configure connections and bootstrap the schema before first use.
//!
//! # Invariants
//! - `save` runs inside a single transaction; readers see the prior dataset
//!   or the new one, never a mix.
//! - Loaded rows that fail to decode are rejected as `InvalidData`, not
//!   silently skipped.

use crate::model::context::Context;
use crate::model::dataset::Dataset;
use crate::model::stack::ContextStack;
use crate::store::{DatasetStore, StoreError, StoreResult};
use log::{debug, error, info};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

const META_ACTIVE_KEY: &str = "active";
const META_STACK_KEY: &str = "stack";

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS contexts (
        name TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// SQLite-backed dataset store.
///
/// Context rows hold the canonical context document; the active pointer and
/// stack are stored as `meta` rows, so the dataset the manager sees is
/// byte-for-byte equivalent to the JSON backend's.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) a database file and bootstraps the
    /// schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = match Connection::open(&path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=store_open module=store backend=sqlite status=error path={} error={}",
                    path.display(),
                    err
                );
                return Err(err.into());
            }
        };
        bootstrap(&conn)?;
        info!(
            "event=store_open module=store backend=sqlite status=ok path={}",
            path.display()
        );
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        bootstrap(&conn)?;
        info!("event=store_open module=store backend=sqlite status=ok mode=memory");
        Ok(Self { conn, path: None })
    }
}

fn bootstrap(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

impl DatasetStore for SqliteStore {
    fn load(&self) -> StoreResult<Dataset> {
        let mut dataset = Dataset::default();

        let mut stmt = self.conn.prepare("SELECT name, data FROM contexts;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            let payload: String = row.get("data")?;
            let context: Context = serde_json::from_str(&payload).map_err(|err| {
                StoreError::InvalidData(format!("context row `{name}` does not decode: {err}"))
            })?;
            dataset.contexts.insert(name, context);
        }

        let mut stmt = self.conn.prepare("SELECT key, value FROM meta;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let key: String = row.get("key")?;
            let value: String = row.get("value")?;
            match key.as_str() {
                META_ACTIVE_KEY => dataset.active = Some(value),
                META_STACK_KEY => {
                    let stack: ContextStack = serde_json::from_str(&value).map_err(|err| {
                        StoreError::InvalidData(format!("stack row does not decode: {err}"))
                    })?;
                    dataset.stack = stack;
                }
                _ => {}
            }
        }

        debug!(
            "event=store_load module=store backend=sqlite status=ok contexts={}",
            dataset.contexts.len()
        );
        Ok(dataset)
    }

    fn save(&mut self, dataset: &Dataset) -> StoreResult<()> {
        let tx = self.conn.transaction()?;

        // Full rewrite: the dataset is the unit of persistence, so rows for
        // contexts deleted since the last save must go away too.
        tx.execute("DELETE FROM contexts;", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO contexts (name, data) VALUES (?1, ?2);")?;
            for (name, context) in &dataset.contexts {
                let payload = serde_json::to_string(context)?;
                insert.execute(params![name, payload])?;
            }
        }

        match &dataset.active {
            Some(active) => {
                tx.execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2);",
                    params![META_ACTIVE_KEY, active],
                )?;
            }
            None => {
                tx.execute("DELETE FROM meta WHERE key = ?1;", params![META_ACTIVE_KEY])?;
            }
        }

        let stack_payload = serde_json::to_string(&dataset.stack)?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2);",
            params![META_STACK_KEY, stack_payload],
        )?;

        tx.commit()?;
        debug!(
            "event=store_save module=store backend=sqlite status=ok contexts={}",
            dataset.contexts.len()
        );
        Ok(())
    }

    fn exists(&self) -> bool {
        match &self.path {
            Some(path) => path.exists(),
            None => false,
        }
    }
}
