use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::HistoryStore;
use super::types::ScheduledTaskRecord;

impl HistoryStore {
    pub async fn add_task(
        &self,
        preset_name: &str,
        trigger: &str,
        next_run_at: DateTime<Utc>,
    ) -> Result<i64> {
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO scheduled_tasks (preset_name, trigger, enabled, next_run_at)
             VALUES (?1, ?2, 1, ?3)",
            params![preset_name, trigger, next_run_at.to_rfc3339()],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub async fn list_tasks(&self) -> Result<Vec<ScheduledTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, preset_name, trigger, enabled, next_run_at, last_run_id
             FROM scheduled_tasks ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn enabled_tasks(&self) -> Result<Vec<ScheduledTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, preset_name, trigger, enabled, next_run_at, last_run_id
             FROM scheduled_tasks WHERE enabled = 1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Option<ScheduledTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, preset_name, trigger, enabled, next_run_at, last_run_id
             FROM scheduled_tasks WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([task_id], row_to_task)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub async fn set_task_enabled(&self, task_id: i64, enabled: bool) -> Result<bool> {
        let db = self.db().lock().await;
        let updated = db.execute(
            "UPDATE scheduled_tasks SET enabled = ?1 WHERE id = ?2",
            params![enabled as i64, task_id],
        )?;
        Ok(updated > 0)
    }

    pub async fn remove_task(&self, task_id: i64) -> Result<bool> {
        let db = self.db().lock().await;
        let deleted = db.execute(
            "DELETE FROM scheduled_tasks WHERE id = ?1",
            params![task_id],
        )?;
        Ok(deleted > 0)
    }

    pub async fn set_task_next_run(&self, task_id: i64, next_run_at: DateTime<Utc>) -> Result<()> {
        let db = self.db().lock().await;
        db.execute(
            "UPDATE scheduled_tasks SET next_run_at = ?1 WHERE id = ?2",
            params![next_run_at.to_rfc3339(), task_id],
        )?;
        Ok(())
    }

    /// Recompute bookkeeping after a fire: the next occurrence (relative to
    /// the fire time, not completion time) and the run that was produced.
    pub async fn record_task_fired(
        &self,
        task_id: i64,
        next_run_at: Option<DateTime<Utc>>,
        last_run_id: Option<i64>,
    ) -> Result<()> {
        let db = self.db().lock().await;
        db.execute(
            "UPDATE scheduled_tasks SET next_run_at = ?1, last_run_id = COALESCE(?2, last_run_id)
             WHERE id = ?3",
            params![next_run_at.map(|t| t.to_rfc3339()), last_run_id, task_id],
        )?;
        Ok(())
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledTaskRecord> {
    let enabled: i64 = row.get(3)?;
    Ok(ScheduledTaskRecord {
        id: row.get(0)?,
        preset_name: row.get(1)?,
        trigger: row.get(2)?,
        enabled: enabled != 0,
        next_run_at: row.get(4)?,
        last_run_id: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_history_store;
    use super::*;

    #[tokio::test]
    async fn task_crud_roundtrip() {
        let store = test_history_store();
        let next = Utc::now();
        let id = store.add_task("nightly", "@every 1h", next).await.unwrap();

        let task = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.preset_name, "nightly");
        assert_eq!(task.trigger, "@every 1h");
        assert!(task.enabled);
        assert!(task.last_run_id.is_none());

        assert!(store.set_task_enabled(id, false).await.unwrap());
        assert!(!store.get_task(id).await.unwrap().unwrap().enabled);
        assert!(store.enabled_tasks().await.unwrap().is_empty());

        assert!(store.remove_task(id).await.unwrap());
        assert!(!store.remove_task(id).await.unwrap());
    }

    #[tokio::test]
    async fn record_task_fired_keeps_last_run_on_none() {
        let store = test_history_store();
        let id = store
            .add_task("nightly", "@every 1h", Utc::now())
            .await
            .unwrap();
        let later = Utc::now() + chrono::Duration::hours(1);

        store
            .record_task_fired(id, Some(later), Some(7))
            .await
            .unwrap();
        let task = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.last_run_id, Some(7));

        // A fire that produced no run (preset failed to load) keeps the old id.
        store.record_task_fired(id, Some(later), None).await.unwrap();
        let task = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.last_run_id, Some(7));
    }
}
