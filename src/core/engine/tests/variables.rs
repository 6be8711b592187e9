use super::*;
use crate::core::engine::types::RunOptions;
use crate::core::error::EngineError;
use serde_json::json;
use std::collections::HashMap;

#[tokio::test]
async fn missing_required_variable_fails_before_any_row() {
    let yaml = r#"
vars:
  - name: target
    required: true
steps:
  - id: deploy
    action: ok
    params:
      target: "${target}"
"#;
    let (engine, history) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let err = engine
        .run(&preset(yaml), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::MissingVariables(_)));
    assert!(err.is_resolution_error());
    assert!(history.list_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_template_token_fails_before_any_row() {
    let yaml = r#"
steps:
  - id: deploy
    action: ok
    params:
      target: "${ghost}"
"#;
    let (engine, history) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let err = engine
        .run(&preset(yaml), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnresolvedToken { .. }));
    assert!(history.list_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn valueless_optional_variable_fails_before_any_row() {
    // Optional, no default, no override: the reference can never resolve,
    // so the run must fail pre-flight instead of mid-step.
    let yaml = r#"
vars:
  - name: target
steps:
  - id: deploy
    action: ok
    params:
      target: "${target}"
"#;
    let (engine, history) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let err = engine
        .run(&preset(yaml), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnresolvedToken { .. }));
    assert!(history.list_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn overrides_are_typed_into_params() {
    let yaml = r#"
vars:
  - name: replicas
    type: number
    default: 1
  - name: force
    type: boolean
    default: false
steps:
  - id: scale
    action: ok
    params:
      replicas: "${replicas}"
      force: "${force}"
      label: "replicas=${replicas}"
"#;
    let (engine, _) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let opts = RunOptions {
        overrides: HashMap::from([
            ("replicas".to_string(), "3".to_string()),
            ("force".to_string(), "true".to_string()),
        ]),
        ..RunOptions::default()
    };
    let result = engine.run(&preset(yaml), &opts).await.unwrap();

    assert_eq!(
        result.steps[0].output,
        Some(json!({"replicas": 3, "force": true, "label": "replicas=3"}))
    );
}

#[tokio::test]
async fn preset_without_vars_runs_fine() {
    let yaml = r#"
steps:
  - id: hello
    action: ok
"#;
    let (engine, _) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();
    assert!(result.success);
}
