//! One step: substitute, gate on the prompt, invoke the handler, apply the
//! retry policy, time it.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::prompt::{PromptResponse, PromptSink};
use super::types::{StepOutcome, StepStatus};
use crate::core::actions::ActionRegistry;
use crate::core::preset::vars::{self, Bindings};
use crate::core::preset::{OnError, Step};

fn base_outcome(step: &Step) -> StepOutcome {
    StepOutcome {
        step_id: step.id.clone(),
        step_name: step.display_name().to_string(),
        action: step.action.clone(),
        status: StepStatus::Skipped,
        duration_ms: 0,
        error: None,
        output: None,
    }
}

pub(super) fn skipped(step: &Step) -> StepOutcome {
    base_outcome(step)
}

pub(super) fn errored(step: &Step, message: String) -> StepOutcome {
    StepOutcome {
        status: StepStatus::Error,
        error: Some(message),
        ..base_outcome(step)
    }
}

pub(super) async fn execute(
    step: &Step,
    bindings: &Bindings,
    registry: &ActionRegistry,
    prompt: &Arc<dyn PromptSink>,
    dry_run: bool,
) -> StepOutcome {
    let resolved = match vars::substitute_params(&step.id, &step.params, bindings) {
        Ok(params) => params,
        Err(e) => return errored(step, e.to_string()),
    };

    if dry_run {
        // Record the action and resolved params so the operator can inspect
        // planned effects; the handler is never invoked.
        return StepOutcome {
            output: Some(Value::Object(resolved)),
            ..base_outcome(step)
        };
    }

    if step.interactive {
        match prompt.confirm(step.display_name(), &step.action).await {
            Ok(PromptResponse::Approved) => {}
            Ok(PromptResponse::Cancelled) => {
                return errored(step, "cancelled at interactive prompt".to_string());
            }
            Err(e) => return errored(step, format!("interactive prompt failed: {}", e)),
        }
    }

    let handler = match registry.resolve(&step.action) {
        Ok(handler) => handler,
        Err(e) => return errored(step, e.to_string()),
    };

    let max_attempts = match step.on_error {
        OnError::Retry(n) => 1 + n,
        _ => 1,
    };

    // All attempts run with the same resolved params and their durations
    // sum into the step's reported duration.
    let started = Instant::now();
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match handler.execute(&resolved).await {
            Ok(output) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    "Step '{}' succeeded in {}ms (attempt {}/{})",
                    step.id, duration_ms, attempt, max_attempts
                );
                return StepOutcome {
                    status: StepStatus::Success,
                    duration_ms,
                    output,
                    ..base_outcome(step)
                };
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt < max_attempts {
                    warn!(
                        "Step '{}' failed (attempt {}/{}), retrying: {}",
                        step.id, attempt, max_attempts, last_error
                    );
                }
            }
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    let error = if max_attempts > 1 {
        format!("after {} attempts: {}", max_attempts, last_error)
    } else {
        last_error
    };
    StepOutcome {
        status: StepStatus::Error,
        duration_ms,
        error: Some(error),
        ..base_outcome(step)
    }
}
