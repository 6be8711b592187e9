use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_retention_days() -> u32 {
    30
}

fn default_tick_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding preset YAML files. Defaults to `<data_dir>/presets`.
    #[serde(default)]
    pub presets_dir: Option<PathBuf>,

    /// Completed runs older than this are eligible for pruning.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Daemon wake interval in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Optional wall-clock limit for scheduled runs. Cancellation happens
    /// at step boundaries, so a long-running handler finishes its step.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,

    /// Command spawned with an event JSON argument after each scheduled run.
    #[serde(default)]
    pub notify_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            presets_dir: None,
            retention_days: default_retention_days(),
            tick_secs: default_tick_secs(),
            task_timeout_secs: None,
            notify_command: None,
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join("config.toml");
        if !config_path.exists() {
            info!("No config.toml found, using defaults.");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn presets_dir(&self, data_dir: &Path) -> PathBuf {
        self.presets_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("presets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path()).await.unwrap();
        assert_eq!(cfg.retention_days, 30);
        assert_eq!(cfg.tick_secs, 5);
        assert!(cfg.task_timeout_secs.is_none());
        assert!(cfg.notify_command.is_none());
    }

    #[tokio::test]
    async fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "retention_days = 7\nnotify_command = \"notify-send cadence\"\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).await.unwrap();
        assert_eq!(cfg.retention_days, 7);
        assert_eq!(cfg.tick_secs, 5);
        assert_eq!(cfg.notify_command.as_deref(), Some("notify-send cadence"));
    }

    #[test]
    fn presets_dir_defaults_under_data_dir() {
        let cfg = Config::default();
        let dir = cfg.presets_dir(Path::new("/tmp/cad"));
        assert_eq!(dir, PathBuf::from("/tmp/cad/presets"));
    }
}
