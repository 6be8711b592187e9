pub mod trigger;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::engine::{PresetEngine, RunOptions, TriggerType};
use crate::core::history::{HistoryStore, RunStatus, ScheduledTaskRecord};
use crate::core::notify::{Notifier, NotifyEvent};
use crate::core::preset::PresetStore;
use trigger::Trigger;

/// The scheduler loop: wakes at a fixed interval, fires due tasks through
/// the engine, and reschedules them relative to fire time.
///
/// An in-memory set of in-flight task ids is the overlap guard — a task
/// stays due until its fire completes, so without the guard every tick
/// would start it again. Two different tasks may run concurrently; only
/// same-task overlap is forbidden.
pub struct Daemon {
    engine: Arc<PresetEngine>,
    presets: Arc<PresetStore>,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
    tick: Duration,
    task_timeout: Option<Duration>,
    firing: Arc<Mutex<HashSet<i64>>>,
}

impl Daemon {
    pub fn new(
        engine: Arc<PresetEngine>,
        presets: Arc<PresetStore>,
        history: Arc<HistoryStore>,
        notifier: Arc<Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            engine,
            presets,
            history,
            notifier,
            tick: Duration::from_secs(config.tick_secs.max(1)),
            task_timeout: config.task_timeout_secs.map(Duration::from_secs),
            firing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.recover_schedules().await?;
        info!("Scheduler loop started (tick every {:?})", self.tick);

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick_once().await {
                        warn!("Scheduler tick failed: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Startup recovery: tasks without a `next_run_at` get one computed
    /// from now. A persisted time already in the past is left alone — it
    /// fires exactly once on the first tick, not once per missed interval.
    pub async fn recover_schedules(&self) -> Result<()> {
        for task in self.history.enabled_tasks().await? {
            if task.next_run_at.is_none() {
                self.restore_next_run(&task).await?;
            }
        }
        Ok(())
    }

    /// Recompute `next_run_at` from now. A trigger that fails to re-parse
    /// after a fire leaves the column NULL, so this runs both at startup
    /// and whenever the loop finds a schedule-less task.
    async fn restore_next_run(&self, task: &ScheduledTaskRecord) -> Result<()> {
        match task.trigger.parse::<Trigger>() {
            Ok(trigger) => {
                if let Some(next) = trigger.next_after(Utc::now()) {
                    self.history.set_task_next_run(task.id, next).await?;
                }
            }
            Err(e) => warn!("Task {} has an unusable trigger: {}", task.id, e),
        }
        Ok(())
    }

    /// One due-check pass. Public so tests can drive the loop directly.
    pub async fn tick_once(&self) -> Result<()> {
        let now = Utc::now();
        for task in self.history.enabled_tasks().await? {
            if task.next_run_at.is_none() {
                self.restore_next_run(&task).await?;
                continue;
            }
            if !is_due(&task, now) {
                continue;
            }
            {
                let mut firing = self.firing.lock().await;
                if !firing.insert(task.id) {
                    continue; // previous fire still in flight
                }
            }
            self.spawn_fire(task, now);
        }
        Ok(())
    }

    fn spawn_fire(&self, task: ScheduledTaskRecord, fired_at: DateTime<Utc>) {
        let engine = Arc::clone(&self.engine);
        let presets = Arc::clone(&self.presets);
        let history = Arc::clone(&self.history);
        let notifier = Arc::clone(&self.notifier);
        let firing = Arc::clone(&self.firing);
        let timeout = self.task_timeout;

        tokio::spawn(async move {
            let task_id = task.id;
            fire_task(engine, presets, history, notifier, task, fired_at, timeout).await;
            firing.lock().await.remove(&task_id);
        });
    }
}

fn is_due(task: &ScheduledTaskRecord, now: DateTime<Utc>) -> bool {
    let Some(next_run_at) = task.next_run_at.as_deref() else {
        return false;
    };
    match DateTime::parse_from_rfc3339(next_run_at) {
        Ok(t) => t.with_timezone(&Utc) <= now,
        Err(e) => {
            warn!(
                "Task {} has an unreadable next_run_at '{}': {}",
                task.id, next_run_at, e
            );
            false
        }
    }
}

/// One fire, with every failure contained: nothing that happens here may
/// take down the scheduler loop, and the task is rescheduled for its next
/// natural occurrence no matter how the run went.
async fn fire_task(
    engine: Arc<PresetEngine>,
    presets: Arc<PresetStore>,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
    task: ScheduledTaskRecord,
    fired_at: DateTime<Utc>,
    timeout: Option<Duration>,
) {
    info!("Firing task {} (preset '{}')", task.id, task.preset_name);
    let next = task
        .trigger
        .parse::<Trigger>()
        .ok()
        .and_then(|t| t.next_after(fired_at));

    let run_id = match presets.load(&task.preset_name).await {
        Ok(preset) => {
            let cancel = CancellationToken::new();
            let watchdog = timeout.map(|limit| {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(limit).await;
                    warn!("Scheduled run exceeded {:?}, cancelling", limit);
                    cancel.cancel();
                })
            });

            let opts = RunOptions {
                trigger: TriggerType::Scheduled,
                cancel,
                ..RunOptions::default()
            };
            let fired = engine.run(&preset, &opts).await;
            if let Some(watchdog) = watchdog {
                watchdog.abort();
            }

            match fired {
                Ok(result) => {
                    let status = if result.success { "success" } else { "error" };
                    notifier
                        .send(&NotifyEvent {
                            event: "run_finished",
                            task_id: task.id,
                            preset: task.preset_name.clone(),
                            run_id: result.run_id,
                            status: status.to_string(),
                            duration_ms: result.total_duration_ms,
                        })
                        .await;
                    result.run_id
                }
                Err(e) => {
                    warn!("Task {} failed before execution: {}", task.id, e);
                    record_failed_fire(&history, &task, &e.to_string()).await
                }
            }
        }
        Err(e) => {
            warn!("Task {} preset failed to load: {}", task.id, e);
            record_failed_fire(&history, &task, &e.to_string()).await
        }
    };

    if let Err(e) = history.record_task_fired(task.id, next, run_id).await {
        warn!("Failed to reschedule task {}: {}", task.id, e);
    }
}

/// The engine writes no rows for load/resolution failures; the daemon
/// records a zero-step error run itself so the failure shows up in
/// `tasks list`.
async fn record_failed_fire(
    history: &HistoryStore,
    task: &ScheduledTaskRecord,
    error: &str,
) -> Option<i64> {
    match history
        .start_run(&task.preset_name, TriggerType::Scheduled, 0)
        .await
    {
        Ok(run_id) => {
            if let Err(e) = history
                .finish_run(run_id, RunStatus::Error, 0, Some(error))
                .await
            {
                warn!("Failed to finalize failure record: {}", e);
            }
            Some(run_id)
        }
        Err(e) => {
            warn!("Failed to record failed fire: {}", e);
            None
        }
    }
}
