mod runs;
mod tasks;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::platform::{NativePlatform, Platform};

pub use types::{RunStatus, ScheduledTaskRecord};

/// Durable log of runs, per-step logs and scheduled tasks.
///
/// All writes are appends or keyed-by-id updates, so callers share the
/// store freely; the connection mutex is the only coordination point.
pub struct HistoryStore {
    db: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        NativePlatform::restrict_dir_permissions(data_dir);

        let db_path = data_dir.join("history.db");
        let db = Connection::open(&db_path)?;
        NativePlatform::restrict_file_permissions(&db_path);
        Self::create_schema(&db)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn create_schema(db: &Connection) -> Result<()> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                preset_name TEXT NOT NULL,
                trigger_type TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                duration_ms INTEGER,
                step_count INTEGER NOT NULL,
                error TEXT
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS run_logs (
                run_id INTEGER NOT NULL,
                step_index INTEGER NOT NULL,
                step_name TEXT NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                error TEXT
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS scheduled_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                preset_name TEXT NOT NULL,
                trigger TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                next_run_at TEXT,
                last_run_id INTEGER
            )",
            [],
        )?;

        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_run_logs_run_id ON run_logs(run_id, step_index)",
            [],
        )?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_preset_started ON runs(preset_name, started_at)",
            [],
        )?;

        Ok(())
    }

    pub(crate) fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }
}

/// In-memory store for tests. Avoids filesystem side-effects.
#[cfg(test)]
pub fn test_history_store() -> HistoryStore {
    let db = Connection::open_in_memory().expect("open in-memory db");
    HistoryStore::create_schema(&db).expect("create schema");
    HistoryStore {
        db: Arc::new(Mutex::new(db)),
    }
}
