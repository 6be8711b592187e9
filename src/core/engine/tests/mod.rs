mod dry_run;
mod error_policy;
mod persistence;
mod variables;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::core::actions::{ActionHandler, ActionRegistry, ActionSpec};
use crate::core::engine::PresetEngine;
use crate::core::engine::prompt::{PromptResponse, PromptSink};
use crate::core::history::{HistoryStore, test_history_store};
use crate::core::preset::Preset;

/// Fails a configured number of times, then succeeds with `output`,
/// counting every invocation.
pub(super) struct FlakyAction {
    pub calls: Arc<AtomicU32>,
    failures_before_success: u32,
    output: Value,
}

impl FlakyAction {
    pub fn new(failures_before_success: u32, output: Value) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                failures_before_success,
                output,
            },
            calls,
        )
    }
}

#[async_trait]
impl ActionHandler for FlakyAction {
    async fn execute(&self, _params: &serde_json::Map<String, Value>) -> Result<Option<Value>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            Err(anyhow::anyhow!("flaky failure #{}", call + 1))
        } else {
            Ok(Some(self.output.clone()))
        }
    }
}

/// Succeeds with the params it received, so tests can observe substitution.
pub(super) struct EchoParams;

#[async_trait]
impl ActionHandler for EchoParams {
    async fn execute(&self, params: &serde_json::Map<String, Value>) -> Result<Option<Value>> {
        Ok(Some(Value::Object(params.clone())))
    }
}

pub(super) struct ApproveAll;

#[async_trait]
impl PromptSink for ApproveAll {
    async fn confirm(&self, _step: &str, _action: &str) -> Result<PromptResponse> {
        Ok(PromptResponse::Approved)
    }
}

pub(super) struct CancelAll;

#[async_trait]
impl PromptSink for CancelAll {
    async fn confirm(&self, _step: &str, _action: &str) -> Result<PromptResponse> {
        Ok(PromptResponse::Cancelled)
    }
}

pub(super) fn spec(action: &str) -> ActionSpec {
    ActionSpec {
        action: action.to_string(),
        description: String::new(),
        params: vec![],
    }
}

pub(super) fn registry_with(
    handlers: Vec<(&str, Arc<dyn ActionHandler>)>,
) -> Arc<ActionRegistry> {
    let mut registry = ActionRegistry::new();
    for (action, handler) in handlers {
        registry.register(spec(action), handler);
    }
    Arc::new(registry)
}

pub(super) fn engine_with(
    handlers: Vec<(&str, Arc<dyn ActionHandler>)>,
) -> (PresetEngine, Arc<HistoryStore>) {
    let history = Arc::new(test_history_store());
    let engine = PresetEngine::new(registry_with(handlers), Arc::clone(&history));
    (engine, history)
}

pub(super) fn preset(yaml: &str) -> Preset {
    Preset::parse("test", yaml).expect("test preset should parse")
}
