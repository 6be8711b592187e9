pub mod vars;

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::warn;

use crate::core::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    #[default]
    String,
    Number,
    Boolean,
}

impl VarType {
    pub fn as_str(self) -> &'static str {
        match self {
            VarType::String => "string",
            VarType::Number => "number",
            VarType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: VarType,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-step failure policy. Parsed from `stop`, `continue` or `retry:<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    #[default]
    Stop,
    Continue,
    Retry(u32),
}

impl FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(OnError::Stop),
            "continue" => Ok(OnError::Continue),
            other => {
                if let Some(count) = other.strip_prefix("retry:") {
                    let n: u32 = count
                        .parse()
                        .map_err(|_| format!("invalid retry count '{}'", count))?;
                    Ok(OnError::Retry(n))
                } else {
                    Err(format!(
                        "unknown on_error policy '{}' (expected stop, continue or retry:<n>)",
                        other
                    ))
                }
            }
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnError::Stop => write!(f, "stop"),
            OnError::Continue => write!(f, "continue"),
            OnError::Retry(n) => write!(f, "retry:{}", n),
        }
    }
}

impl<'de> Deserialize<'de> for OnError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default, alias = "onError")]
    pub on_error: OnError,
    #[serde(default)]
    pub output: Option<String>,
}

impl Step {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    /// Filename-derived, injected after parsing.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vars: Vec<VariableDef>,
    pub steps: Vec<Step>,
}

impl Preset {
    pub fn parse(name: &str, content: &str) -> Result<Self, EngineError> {
        let mut preset: Preset =
            serde_yaml::from_str(content).map_err(|e| EngineError::PresetParse {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        preset.name = name.to_string();
        preset.validate()?;
        Ok(preset)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::PresetInvalid {
            name: self.name.clone(),
            reason,
        };

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(invalid(format!("duplicate step id '{}'", step.id)));
            }
        }

        let var_names: HashSet<&str> = self.vars.iter().map(|v| v.name.as_str()).collect();
        if var_names.len() != self.vars.len() {
            return Err(invalid("duplicate variable declaration".to_string()));
        }
        for step in &self.steps {
            if let Some(output) = &step.output
                && var_names.contains(output.as_str())
            {
                return Err(invalid(format!(
                    "step '{}' output '{}' collides with a declared variable",
                    step.id, output
                )));
            }
        }
        Ok(())
    }
}

/// Loads presets by name from the presets directory, or by explicit path.
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self, name_or_path: &str) -> Result<Preset, EngineError> {
        let path = self.resolve_path(name_or_path).await?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name_or_path)
            .to_string();
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| EngineError::PresetParse {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        Preset::parse(&name, &content)
    }

    async fn resolve_path(&self, name_or_path: &str) -> Result<PathBuf, EngineError> {
        let as_path = Path::new(name_or_path);
        let looks_like_path = name_or_path.contains(std::path::MAIN_SEPARATOR)
            || name_or_path.ends_with(".yaml")
            || name_or_path.ends_with(".yml");
        if looks_like_path {
            if as_path.exists() {
                return Ok(as_path.to_path_buf());
            }
            return Err(EngineError::PresetNotFound(name_or_path.to_string()));
        }
        for ext in ["yaml", "yml"] {
            let candidate = self.dir.join(format!("{}.{}", name_or_path, ext));
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(EngineError::PresetNotFound(name_or_path.to_string()))
    }

    /// All parseable presets in the directory, sorted by name. Files that
    /// fail to parse are skipped with a warning so one bad file does not
    /// hide the rest.
    pub async fn list(&self) -> Result<Vec<Preset>> {
        let mut presets = Vec::new();
        if !self.dir.is_dir() {
            return Ok(presets);
        }
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            if !is_yaml {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            match fs::read_to_string(&path).await {
                Ok(content) => match Preset::parse(&name, &content) {
                    Ok(preset) => presets.push(preset),
                    Err(e) => warn!("Skipping preset at {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read preset at {:?}: {}", path, e),
            }
        }
        presets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(presets)
    }
}
