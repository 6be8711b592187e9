use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    Approved,
    Cancelled,
}

/// Where interactive steps send their confirmation request. The run blocks
/// until a response arrives; cancelling counts as a step error governed by
/// the step's `on_error` policy.
#[async_trait]
pub trait PromptSink: Send + Sync {
    async fn confirm(&self, step_name: &str, action: &str) -> Result<PromptResponse>;
}

/// Asks on the controlling terminal. `inquire` is blocking, so the prompt
/// runs on the blocking pool.
pub struct TerminalPrompt;

#[async_trait]
impl PromptSink for TerminalPrompt {
    async fn confirm(&self, step_name: &str, action: &str) -> Result<PromptResponse> {
        let message = format!("Run step '{}' ({})?", step_name, action);
        let answer = tokio::task::spawn_blocking(move || {
            inquire::Confirm::new(&message).with_default(true).prompt()
        })
        .await?;
        match answer {
            Ok(true) => Ok(PromptResponse::Approved),
            Ok(false) => Ok(PromptResponse::Cancelled),
            // Esc / Ctrl+C on the prompt cancels the step, not the process.
            Err(
                inquire::InquireError::OperationCanceled
                | inquire::InquireError::OperationInterrupted,
            ) => Ok(PromptResponse::Cancelled),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sink for contexts with no operator attached (scheduled runs). Every
/// interactive step is cancelled rather than silently approved.
pub struct NonInteractive;

#[async_trait]
impl PromptSink for NonInteractive {
    async fn confirm(&self, _step_name: &str, _action: &str) -> Result<PromptResponse> {
        Ok(PromptResponse::Cancelled)
    }
}
