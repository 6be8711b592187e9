use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::prompt::{NonInteractive, PromptSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Daemon,
}

impl TriggerType {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerType::Manual => "manual",
            TriggerType::Scheduled => "scheduled",
            TriggerType::Daemon => "daemon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
    Skipped,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Error => "error",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub step_name: String,
    pub action: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub output: Option<Value>,
}

/// Aggregate outcome of one engine invocation. Created fresh per run and
/// never mutated after the engine returns it.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Option<i64>,
    pub success: bool,
    pub steps: Vec<StepOutcome>,
    pub total_duration_ms: u64,
}

#[derive(Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub overrides: HashMap<String, String>,
    pub verbose: bool,
    pub trigger: TriggerType,
    pub prompt: Arc<dyn PromptSink>,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            overrides: HashMap::new(),
            verbose: false,
            trigger: TriggerType::Manual,
            prompt: Arc::new(NonInteractive),
            cancel: CancellationToken::new(),
        }
    }
}
