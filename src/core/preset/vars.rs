//! Variable resolution and `${name}` template substitution.
//!
//! Substitution is a textual expansion over the string leaves of step
//! params plus a typed binding table; it performs no I/O, so the whole
//! module is unit-testable without executing a step.

use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::{Preset, VarType, VariableDef};
use crate::core::error::EngineError;

pub type Bindings = HashMap<String, Value>;

/// Merge declared defaults with CLI/daemon overrides into a binding table.
///
/// Fail-fast: every missing required variable is reported in one error and
/// nothing executes.
pub fn resolve(
    vars: &[VariableDef],
    overrides: &HashMap<String, String>,
) -> Result<Bindings, EngineError> {
    let declared: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    for key in overrides.keys() {
        if !declared.contains(&key.as_str()) {
            warn!("Ignoring override for undeclared variable '{}'", key);
        }
    }

    let mut bindings = Bindings::new();
    let mut missing = Vec::new();
    for def in vars {
        if let Some(raw) = overrides.get(&def.name) {
            bindings.insert(def.name.clone(), parse_typed(def, raw)?);
        } else if let Some(default) = &def.default {
            bindings.insert(def.name.clone(), default.clone());
        } else if def.required {
            missing.push(def.name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(EngineError::MissingVariables(missing));
    }
    Ok(bindings)
}

fn parse_typed(def: &VariableDef, raw: &str) -> Result<Value, EngineError> {
    let invalid = || EngineError::InvalidVariableValue {
        name: def.name.clone(),
        expected: def.var_type.as_str(),
        value: raw.to_string(),
    };
    match def.var_type {
        VarType::String => Ok(Value::String(raw.to_string())),
        VarType::Number => {
            if let Ok(i) = raw.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
            let f: f64 = raw.parse().map_err(|_| invalid())?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        VarType::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
    }
}

/// Names referenced as `${name}` in a string, in order of appearance.
pub fn scan_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                tokens.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    tokens
}

/// Check every template token against the resolved bindings plus the
/// outputs of earlier steps, before any step runs. A token naming anything
/// else is a resolution-time error, never a surprise mid-run. Checking
/// bindings rather than declarations matters for optional variables: one
/// declared without a default and not overridden has no value, so a step
/// referencing it could only fail later.
pub fn validate_references(preset: &Preset, bindings: &Bindings) -> Result<(), EngineError> {
    let mut known: Vec<&str> = bindings.keys().map(String::as_str).collect();
    for step in &preset.steps {
        for token in tokens_in_value(&Value::Object(step.params.clone())) {
            if !known.contains(&token.as_str()) {
                return Err(EngineError::UnresolvedToken {
                    step: step.id.clone(),
                    token,
                });
            }
        }
        if let Some(output) = &step.output {
            known.push(output.as_str());
        }
    }
    Ok(())
}

fn tokens_in_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => scan_tokens(s),
        Value::Array(items) => items.iter().flat_map(tokens_in_value).collect(),
        Value::Object(map) => map.values().flat_map(tokens_in_value).collect(),
        _ => Vec::new(),
    }
}

/// Expand `${name}` tokens throughout a params object.
///
/// A string that is exactly one token keeps the bound value's native type;
/// tokens embedded in longer strings are stringified in place. An unbound
/// name here means a prior step that should have produced it failed or was
/// skipped — the caller treats it as a step error.
pub fn substitute_params(
    step_id: &str,
    params: &serde_json::Map<String, Value>,
    bindings: &Bindings,
) -> Result<serde_json::Map<String, Value>, EngineError> {
    let mut out = serde_json::Map::with_capacity(params.len());
    for (key, value) in params {
        out.insert(key.clone(), substitute_value(step_id, value, bindings)?);
    }
    Ok(out)
}

fn substitute_value(
    step_id: &str,
    value: &Value,
    bindings: &Bindings,
) -> Result<Value, EngineError> {
    match value {
        Value::String(s) => substitute_string(step_id, s, bindings),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute_value(step_id, item, bindings)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), substitute_value(step_id, v, bindings)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(step_id: &str, input: &str, bindings: &Bindings) -> Result<Value, EngineError> {
    let tokens = scan_tokens(input);
    if tokens.is_empty() {
        return Ok(Value::String(input.to_string()));
    }

    let lookup = |token: &str| -> Result<&Value, EngineError> {
        bindings
            .get(token)
            .ok_or_else(|| EngineError::UnresolvedToken {
                step: step_id.to_string(),
                token: token.to_string(),
            })
    };

    // A lone token in a typed slot keeps its native type.
    if tokens.len() == 1 && input == format!("${{{}}}", tokens[0]) {
        return Ok(lookup(&tokens[0])?.clone());
    }

    let mut result = input.to_string();
    for token in &tokens {
        let bound = lookup(token)?;
        result = result.replace(&format!("${{{}}}", token), &display_value(bound));
    }
    Ok(Value::String(result))
}

/// String form of a bound value for embedding into templates.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
