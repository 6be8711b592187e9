use anyhow::Result;
use chrono::{Duration, Utc};
use rusqlite::params;

use super::HistoryStore;
use super::types::{PresetStats, RunLogRecord, RunRecord, RunStatus};
use crate::core::engine::{StepOutcome, TriggerType};

impl HistoryStore {
    /// Open a run row in `running` status so concurrent observers see the
    /// in-flight state. Returns the monotonic run id.
    pub async fn start_run(
        &self,
        preset_name: &str,
        trigger: TriggerType,
        step_count: usize,
    ) -> Result<i64> {
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO runs (preset_name, trigger_type, status, started_at, step_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                preset_name,
                trigger.as_str(),
                RunStatus::Running.as_str(),
                Utc::now().to_rfc3339(),
                step_count as i64,
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Append one completed step's outcome. Rows are written once and never
    /// updated.
    pub async fn append_log(
        &self,
        run_id: i64,
        step_index: usize,
        outcome: &StepOutcome,
    ) -> Result<()> {
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO run_logs (run_id, step_index, step_name, action, status, duration_ms, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                step_index as i64,
                outcome.step_name,
                outcome.action,
                outcome.status.as_str(),
                outcome.duration_ms as i64,
                outcome.error,
            ],
        )?;
        Ok(())
    }

    pub async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        duration_ms: u64,
        error: Option<&str>,
    ) -> Result<()> {
        let db = self.db().lock().await;
        db.execute(
            "UPDATE runs SET status = ?1, duration_ms = ?2, error = ?3 WHERE id = ?4",
            params![status.as_str(), duration_ms as i64, error, run_id],
        )?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, preset_name, trigger_type, status, started_at, duration_ms, step_count, error
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], row_to_run)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<RunRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, preset_name, trigger_type, status, started_at, duration_ms, step_count, error
             FROM runs WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([run_id], row_to_run)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub async fn get_run_logs(&self, run_id: i64) -> Result<Vec<RunLogRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT run_id, step_index, step_name, action, status, duration_ms, error
             FROM run_logs WHERE run_id = ?1 ORDER BY step_index ASC",
        )?;
        let rows = stmt.query_map([run_id], |row| {
            Ok(RunLogRecord {
                run_id: row.get(0)?,
                step_index: row.get(1)?,
                step_name: row.get(2)?,
                action: row.get(3)?,
                status: row.get(4)?,
                duration_ms: row.get(5)?,
                error: row.get(6)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Delete completed runs older than the retention window together with
    /// their logs, in one transaction. A `running` row is never pruned
    /// regardless of age. Returns the number of runs deleted.
    pub async fn prune_older_than(&self, days: u32) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::days(days as i64)).to_rfc3339();
        let mut db = self.db().lock().await;
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM run_logs WHERE run_id IN (
                SELECT id FROM runs WHERE status != 'running' AND started_at < ?1
            )",
            params![cutoff],
        )?;
        let deleted = tx.execute(
            "DELETE FROM runs WHERE status != 'running' AND started_at < ?1",
            params![cutoff],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    pub async fn preset_stats(&self, preset_name: &str) -> Result<PresetStats> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT COUNT(*), MAX(started_at) FROM runs WHERE preset_name = ?1",
        )?;
        let stats = stmt.query_row([preset_name], |row| {
            Ok(PresetStats {
                run_count: row.get(0)?,
                last_run_at: row.get(1)?,
            })
        })?;
        Ok(stats)
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(3)?;
    Ok(RunRecord {
        id: row.get(0)?,
        preset_name: row.get(1)?,
        trigger_type: row.get(2)?,
        status: RunStatus::from_status(&status).unwrap_or(RunStatus::Error),
        started_at: row.get(4)?,
        duration_ms: row.get(5)?,
        step_count: row.get(6)?,
        error: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_history_store;
    use super::*;
    use crate::core::engine::types::StepStatus;

    fn outcome(name: &str, status: StepStatus, error: Option<&str>) -> StepOutcome {
        StepOutcome {
            step_id: name.to_string(),
            step_name: name.to_string(),
            action: "echo".to_string(),
            status,
            duration_ms: 12,
            error: error.map(String::from),
            output: None,
        }
    }

    #[tokio::test]
    async fn run_roundtrip_reproduces_fields() {
        let store = test_history_store();
        let run_id = store
            .start_run("deploy", TriggerType::Manual, 2)
            .await
            .unwrap();

        store
            .append_log(run_id, 0, &outcome("build", StepStatus::Success, None))
            .await
            .unwrap();
        store
            .append_log(run_id, 1, &outcome("ship", StepStatus::Error, Some("boom")))
            .await
            .unwrap();
        store
            .finish_run(run_id, RunStatus::Error, 345, Some("boom"))
            .await
            .unwrap();

        let run = store.get_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.preset_name, "deploy");
        assert_eq!(run.trigger_type, "manual");
        assert_eq!(run.status, RunStatus::Error);
        assert_eq!(run.duration_ms, Some(345));
        assert_eq!(run.step_count, 2);
        assert_eq!(run.error.as_deref(), Some("boom"));

        let logs = store.get_run_logs(run_id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].step_name, "build");
        assert_eq!(logs[0].status, "success");
        assert_eq!(logs[1].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn start_run_is_visible_as_running() {
        let store = test_history_store();
        let run_id = store
            .start_run("deploy", TriggerType::Scheduled, 3)
            .await
            .unwrap();
        let run = store.get_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.duration_ms.is_none());
    }

    #[tokio::test]
    async fn list_runs_is_most_recent_first() {
        let store = test_history_store();
        for _ in 0..3 {
            let id = store
                .start_run("p", TriggerType::Manual, 0)
                .await
                .unwrap();
            store
                .finish_run(id, RunStatus::Success, 1, None)
                .await
                .unwrap();
        }
        let runs = store.list_runs(2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].id > runs[1].id);
    }

    #[tokio::test]
    async fn prune_cascades_logs_and_spares_running_rows() {
        let store = test_history_store();

        let old_done = store.start_run("old", TriggerType::Manual, 1).await.unwrap();
        store
            .append_log(old_done, 0, &outcome("s", StepStatus::Success, None))
            .await
            .unwrap();
        store
            .finish_run(old_done, RunStatus::Success, 5, None)
            .await
            .unwrap();

        let old_running = store
            .start_run("stuck", TriggerType::Daemon, 1)
            .await
            .unwrap();

        // Backdate both runs past the retention window.
        {
            let db = store.db().lock().await;
            let ancient = (Utc::now() - Duration::days(90)).to_rfc3339();
            db.execute("UPDATE runs SET started_at = ?1", params![ancient])
                .unwrap();
        }

        let deleted = store.prune_older_than(30).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_run(old_done).await.unwrap().is_none());
        assert!(store.get_run_logs(old_done).await.unwrap().is_empty());
        assert!(store.get_run(old_running).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn preset_stats_counts_runs() {
        let store = test_history_store();
        assert_eq!(store.preset_stats("p").await.unwrap().run_count, 0);
        let id = store.start_run("p", TriggerType::Manual, 0).await.unwrap();
        store
            .finish_run(id, RunStatus::Success, 1, None)
            .await
            .unwrap();
        let stats = store.preset_stats("p").await.unwrap();
        assert_eq!(stats.run_count, 1);
        assert!(stats.last_run_at.is_some());
    }
}
