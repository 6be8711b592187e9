use super::*;
use crate::core::engine::types::{RunOptions, StepStatus};
use serde_json::json;
use std::collections::HashMap;

const PRESET: &str = r#"
vars:
  - name: env
    default: staging
steps:
  - id: build
    action: build
    params:
      env: "${env}"
    output: artifact
  - id: deploy
    action: deploy
    params:
      target: "${artifact}"
"#;

fn dry_opts() -> RunOptions {
    RunOptions {
        dry_run: true,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn dry_run_skips_everything_and_invokes_nothing() {
    let (build, build_calls) = FlakyAction::new(0, json!("a"));
    let (deploy, deploy_calls) = FlakyAction::new(0, json!("b"));
    let (engine, _) = engine_with(vec![
        ("build", Arc::new(build)),
        ("deploy", Arc::new(deploy)),
    ]);

    let result = engine.run(&preset(PRESET), &dry_opts()).await.unwrap();

    assert!(result.success);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Skipped));
    assert_eq!(build_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(deploy_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_records_resolved_params() {
    let (engine, _) = engine_with(vec![]);
    let overrides = HashMap::from([("env".to_string(), "prod".to_string())]);
    let opts = RunOptions {
        overrides,
        ..dry_opts()
    };
    let result = engine.run(&preset(PRESET), &opts).await.unwrap();

    assert_eq!(result.steps[0].output, Some(json!({"env": "prod"})));
    // Unproduced outputs stay visible as literal tokens in the plan.
    assert_eq!(result.steps[1].output, Some(json!({"target": "${artifact}"})));
}

#[tokio::test]
async fn dry_run_is_idempotent() {
    let (engine, _) = engine_with(vec![]);
    let first = engine.run(&preset(PRESET), &dry_opts()).await.unwrap();
    let second = engine.run(&preset(PRESET), &dry_opts()).await.unwrap();

    let shape = |r: &crate::core::engine::RunResult| {
        r.steps
            .iter()
            .map(|s| (s.step_id.clone(), s.status))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
}

#[tokio::test]
async fn dry_run_skips_interactive_prompts() {
    let yaml = r#"
steps:
  - id: risky
    action: nuke
    interactive: true
"#;
    // CancelAll would fail the step if the prompt were consulted.
    let (engine, _) = engine_with(vec![]);
    let opts = RunOptions {
        prompt: Arc::new(CancelAll),
        ..dry_opts()
    };
    let result = engine.run(&preset(yaml), &opts).await.unwrap();
    assert_eq!(result.steps[0].status, StepStatus::Skipped);
}
