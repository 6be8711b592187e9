pub mod prompt;
mod step;
pub mod types;

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::actions::ActionRegistry;
use crate::core::error::EngineError;
use crate::core::history::{HistoryStore, RunStatus};
use crate::core::preset::vars;
use crate::core::preset::{OnError, Preset};

pub use types::{RunOptions, RunResult, StepOutcome, StepStatus, TriggerType};

/// Drives a preset's steps in declared order, one at a time.
///
/// Variable resolution happens before anything is persisted, so a
/// resolution failure leaves zero rows behind. Once execution starts the
/// run is visible as `running` and every step, skipped ones included, gets
/// a log row. History write failures degrade to warnings; the in-memory
/// result is still returned.
pub struct PresetEngine {
    registry: Arc<ActionRegistry>,
    history: Arc<HistoryStore>,
}

impl PresetEngine {
    pub fn new(registry: Arc<ActionRegistry>, history: Arc<HistoryStore>) -> Self {
        Self { registry, history }
    }

    pub async fn run(&self, preset: &Preset, opts: &RunOptions) -> Result<RunResult, EngineError> {
        let mut bindings = vars::resolve(&preset.vars, &opts.overrides)?;
        vars::validate_references(preset, &bindings)?;

        // Commit point: from here on, failures are contained in the result.
        let run_id = match self
            .history
            .start_run(&preset.name, opts.trigger, preset.steps.len())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("History write failed, run will not be durably logged: {}", e);
                None
            }
        };

        info!(
            "Running preset '{}' ({} steps{})",
            preset.name,
            preset.steps.len(),
            if opts.dry_run { ", dry-run" } else { "" }
        );

        let started = Instant::now();
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(preset.steps.len());
        let mut aborted = false;
        let mut first_error: Option<String> = None;

        for (index, s) in preset.steps.iter().enumerate() {
            let outcome = if aborted {
                step::skipped(s)
            } else if opts.cancel.is_cancelled() {
                // Cancellation lands on step boundaries: the step about to
                // run errors out, the rest are skipped.
                aborted = true;
                step::errored(s, "run cancelled".to_string())
            } else {
                if opts.verbose {
                    info!("[{}/{}] {} ({})", index + 1, preset.steps.len(), s.display_name(), s.action);
                }
                let outcome =
                    step::execute(s, &bindings, &self.registry, &opts.prompt, opts.dry_run).await;
                if outcome.status == StepStatus::Error && !matches!(s.on_error, OnError::Continue) {
                    aborted = true;
                }
                outcome
            };

            if outcome.status == StepStatus::Success
                && let Some(name) = &s.output
            {
                bindings.insert(
                    name.clone(),
                    outcome.output.clone().unwrap_or(Value::Null),
                );
            }
            if opts.dry_run && let Some(name) = &s.output {
                // Keep downstream templates resolvable in dry-run without
                // inventing values: the token survives as literal text.
                bindings.insert(name.clone(), Value::String(format!("${{{}}}", name)));
            }

            if let Some(id) = run_id
                && let Err(e) = self.history.append_log(id, index, &outcome).await
            {
                warn!("Failed to log step '{}': {}", outcome.step_id, e);
            }
            if first_error.is_none() {
                first_error = outcome.error.clone();
            }
            outcomes.push(outcome);
        }

        let success = outcomes.iter().all(|o| o.status != StepStatus::Error);
        let total_duration_ms = started.elapsed().as_millis() as u64;
        if let Some(id) = run_id {
            let status = if success {
                RunStatus::Success
            } else {
                RunStatus::Error
            };
            if let Err(e) = self
                .history
                .finish_run(id, status, total_duration_ms, first_error.as_deref())
                .await
            {
                warn!("Failed to finalize run {}: {}", id, e);
            }
        }

        Ok(RunResult {
            run_id,
            success,
            steps: outcomes,
            total_duration_ms,
        })
    }
}

#[cfg(test)]
mod tests;
