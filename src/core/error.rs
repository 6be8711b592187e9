use thiserror::Error;

/// Failures that abort a run before any step executes.
///
/// Everything here propagates to the caller as-is; once execution has
/// started, step failures are folded into the `RunResult` instead and
/// never escape the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    #[error("failed to parse preset '{name}': {reason}")]
    PresetParse { name: String, reason: String },

    #[error("preset '{name}' is invalid: {reason}")]
    PresetInvalid { name: String, reason: String },

    #[error("missing required variable(s): {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("invalid value for variable '{name}': expected {expected}, got '{value}'")]
    InvalidVariableValue {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("step '{step}' references unknown variable '{token}'")]
    UnresolvedToken { step: String, token: String },
}

impl EngineError {
    /// True for errors raised by variable resolution rather than preset loading.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            EngineError::MissingVariables(_)
                | EngineError::InvalidVariableValue { .. }
                | EngineError::UnresolvedToken { .. }
        )
    }
}
