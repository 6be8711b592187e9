use serde::Serialize;
use tracing::warn;

use crate::platform::{NativePlatform, Platform};

#[derive(Debug, Serialize)]
pub struct NotifyEvent {
    pub event: &'static str,
    pub task_id: i64,
    pub preset: String,
    pub run_id: Option<i64>,
    pub status: String,
    pub duration_ms: u64,
}

/// Fires the configured notify command with the event JSON in
/// `CADENCE_EVENT`. Delivery failures are logged and swallowed; they must
/// never affect run status.
pub struct Notifier {
    command: Option<String>,
}

impl Notifier {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    pub async fn send(&self, event: &NotifyEvent) {
        let Some(command) = &self.command else {
            return;
        };
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize notify event: {}", e);
                return;
            }
        };
        let mut cmd = NativePlatform::shell_inline(command);
        cmd.env("CADENCE_EVENT", payload);
        match cmd.output().await {
            Ok(output) if !output.status.success() => {
                warn!(
                    "Notify command exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => warn!("Notify command failed to spawn: {}", e),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_notifier_is_a_noop() {
        let notifier = Notifier::new(None);
        notifier
            .send(&NotifyEvent {
                event: "run_finished",
                task_id: 1,
                preset: "p".to_string(),
                run_id: Some(1),
                status: "success".to_string(),
                duration_ms: 5,
            })
            .await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_does_not_propagate() {
        let notifier = Notifier::new(Some("exit 3".to_string()));
        notifier
            .send(&NotifyEvent {
                event: "run_finished",
                task_id: 1,
                preset: "p".to_string(),
                run_id: None,
                status: "error".to_string(),
                duration_ms: 0,
            })
            .await;
    }
}
