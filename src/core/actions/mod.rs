pub mod builtin;
pub mod external;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One declared parameter of an action, for catalog introspection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionSpec {
    pub action: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogGroup {
    pub prefix: String,
    pub description: String,
    pub actions: Vec<ActionSpec>,
}

/// An executable action. Handlers perform the effect and either return an
/// optional output value or fail; the registry never interprets failures,
/// it forwards them to the step executor.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, params: &serde_json::Map<String, Value>) -> Result<Option<Value>>;
}

/// Builtin actions are bare identifiers; external ones carry a `<tool>.`
/// prefix assigned at registration.
pub fn is_builtin_action(id: &str) -> bool {
    !id.contains('.')
}

struct Registered {
    spec: ActionSpec,
    handler: Arc<dyn ActionHandler>,
}

/// Maps action identifiers to handlers. Constructed once at process start
/// and passed by reference to the engine so tests can inject fakes.
pub struct ActionRegistry {
    actions: HashMap<String, Registered>,
    tool_descriptions: HashMap<String, String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            tool_descriptions: HashMap::new(),
        }
    }

    pub fn register(&mut self, spec: ActionSpec, handler: Arc<dyn ActionHandler>) {
        info!("Registering action: {}", spec.action);
        self.actions.insert(
            spec.action.clone(),
            Registered {
                spec,
                handler,
            },
        );
    }

    /// Register a command-line tool as a group of external actions. Each
    /// subcommand becomes `<tool>.<subcommand>` backed by a subprocess
    /// handler.
    pub fn register_tool(
        &mut self,
        tool: &str,
        description: &str,
        binary: std::path::PathBuf,
        subcommands: Vec<ActionSpec>,
    ) {
        self.tool_descriptions
            .insert(tool.to_string(), description.to_string());
        for mut spec in subcommands {
            let subcommand = spec.action.clone();
            spec.action = format!("{}.{}", tool, subcommand);
            let handler = Arc::new(external::ExternalToolHandler::new(
                binary.clone(),
                subcommand,
            ));
            self.register(spec, handler);
        }
    }

    pub fn resolve(&self, action_id: &str) -> Result<Arc<dyn ActionHandler>> {
        self.actions
            .get(action_id)
            .map(|r| Arc::clone(&r.handler))
            .ok_or_else(|| anyhow::anyhow!("unknown action: {}", action_id))
    }

    /// Catalog grouped by prefix: one `builtin` group plus one per
    /// registered external tool.
    pub fn catalog(&self) -> Vec<CatalogGroup> {
        let mut groups: HashMap<String, CatalogGroup> = HashMap::new();
        for registered in self.actions.values() {
            let spec = &registered.spec;
            let (prefix, description) = if is_builtin_action(&spec.action) {
                ("builtin".to_string(), "In-process actions".to_string())
            } else {
                let prefix = spec
                    .action
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let description = self
                    .tool_descriptions
                    .get(&prefix)
                    .cloned()
                    .unwrap_or_default();
                (prefix, description)
            };
            groups
                .entry(prefix.clone())
                .or_insert_with(|| CatalogGroup {
                    prefix,
                    description,
                    actions: Vec::new(),
                })
                .actions
                .push(spec.clone());
        }
        let mut out: Vec<CatalogGroup> = groups.into_values().collect();
        for group in &mut out {
            group.actions.sort_by(|a, b| a.action.cmp(&b.action));
        }
        out.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        out
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
