//! The minimal builtin action set: enough to exercise a preset end to end.
//! Anything with real side effects belongs to external tools.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{ActionHandler, ActionRegistry, ActionSpec, ParamSpec};
use crate::core::preset::vars::display_value;

struct EchoAction;

#[async_trait]
impl ActionHandler for EchoAction {
    async fn execute(&self, params: &serde_json::Map<String, Value>) -> Result<Option<Value>> {
        let message = params
            .get("message")
            .map(display_value)
            .unwrap_or_default();
        info!("echo: {}", message);
        println!("{}", message);
        Ok(Some(Value::String(message)))
    }
}

struct WaitAction;

#[async_trait]
impl ActionHandler for WaitAction {
    async fn execute(&self, params: &serde_json::Map<String, Value>) -> Result<Option<Value>> {
        let seconds = params
            .get("seconds")
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("wait requires a numeric 'seconds' param"))?;
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        Ok(None)
    }
}

pub fn register_defaults(registry: &mut ActionRegistry) {
    registry.register(
        ActionSpec {
            action: "echo".to_string(),
            description: "Print and return a message".to_string(),
            params: vec![ParamSpec::optional("message", "Text to print (empty when omitted)")],
        },
        Arc::new(EchoAction),
    );
    registry.register(
        ActionSpec {
            action: "wait".to_string(),
            description: "Pause the run for a number of seconds".to_string(),
            params: vec![ParamSpec::required("seconds", "How long to wait")],
        },
        Arc::new(WaitAction),
    );
}
