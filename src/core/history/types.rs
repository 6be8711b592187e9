use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "running" => Some(RunStatus::Running),
            "success" => Some(RunStatus::Success),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub preset_name: String,
    pub trigger_type: String,
    pub status: RunStatus,
    pub started_at: String,
    pub duration_ms: Option<i64>,
    pub step_count: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunLogRecord {
    pub run_id: i64,
    pub step_index: i64,
    pub step_name: String,
    pub action: String,
    pub status: String,
    pub duration_ms: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTaskRecord {
    pub id: i64,
    pub preset_name: String,
    pub trigger: String,
    pub enabled: bool,
    pub next_run_at: Option<String>,
    pub last_run_id: Option<i64>,
}

/// Aggregate shown by `presets list` / `presets show`.
#[derive(Debug, Clone, Serialize)]
pub struct PresetStats {
    pub run_count: i64,
    pub last_run_at: Option<String>,
}
