use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

use super::ActionHandler;
use crate::core::preset::vars::display_value;

/// Delegates an action to another registered command-line tool.
///
/// Invocation shape: `<binary> <subcommand> --<param> <value>...`, with the
/// tool's stdout becoming the step output (parsed as JSON when it is JSON,
/// kept as a trimmed string otherwise).
pub struct ExternalToolHandler {
    binary: PathBuf,
    subcommand: String,
}

impl ExternalToolHandler {
    pub fn new(binary: PathBuf, subcommand: String) -> Self {
        Self { binary, subcommand }
    }
}

#[async_trait]
impl ActionHandler for ExternalToolHandler {
    async fn execute(&self, params: &serde_json::Map<String, Value>) -> Result<Option<Value>> {
        info!(
            "Delegating to external tool {:?} {}",
            self.binary, self.subcommand
        );

        let mut cmd = Command::new(&self.binary);
        cmd.arg(&self.subcommand);
        for (key, value) in params {
            cmd.arg(format!("--{}", key));
            cmd.arg(display_value(value));
        }

        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "external tool exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&stdout) {
            Ok(json) => Ok(Some(json)),
            Err(_) => Ok(Some(Value::String(stdout))),
        }
    }
}
