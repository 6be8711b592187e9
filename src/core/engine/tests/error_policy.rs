use super::*;
use crate::core::engine::types::{RunOptions, StepStatus};
use serde_json::json;

const THREE_STEPS_STOP: &str = r#"
steps:
  - id: one
    action: ok
  - id: two
    action: boom
  - id: three
    action: ok
"#;

#[tokio::test]
async fn stop_policy_skips_remaining_steps() {
    let (boom, _) = FlakyAction::new(u32::MAX, json!(null));
    let (engine, _) = engine_with(vec![
        ("ok", Arc::new(EchoParams)),
        ("boom", Arc::new(boom)),
    ]);
    let result = engine
        .run(&preset(THREE_STEPS_STOP), &RunOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.steps[0].status, StepStatus::Success);
    assert_eq!(result.steps[1].status, StepStatus::Error);
    assert_eq!(result.steps[2].status, StepStatus::Skipped);
}

#[tokio::test]
async fn continue_policy_runs_past_the_failure() {
    let yaml = r#"
steps:
  - id: one
    action: ok
  - id: two
    action: boom
    on_error: continue
  - id: three
    action: ok
"#;
    let (boom, _) = FlakyAction::new(u32::MAX, json!(null));
    let (engine, _) = engine_with(vec![
        ("ok", Arc::new(EchoParams)),
        ("boom", Arc::new(boom)),
    ]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert!(!result.success, "a contained error still fails the run");
    assert_eq!(result.steps[1].status, StepStatus::Error);
    assert_eq!(result.steps[2].status, StepStatus::Success);
}

#[tokio::test]
async fn retry_recovers_and_sums_attempt_durations() {
    let yaml = r#"
steps:
  - id: flaky
    action: flaky
    on_error: "retry:2"
"#;
    let (flaky, calls) = FlakyAction::new(2, json!("finally"));
    let (engine, _) = engine_with(vec![("flaky", Arc::new(flaky))]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.steps[0].status, StepStatus::Success);
    assert_eq!(result.steps[0].output, Some(json!("finally")));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    // The reported duration covers all three attempts.
    assert!(result.steps[0].duration_ms <= result.total_duration_ms);
}

#[tokio::test]
async fn retry_exhaustion_falls_back_to_stop() {
    let yaml = r#"
steps:
  - id: flaky
    action: flaky
    on_error: "retry:1"
  - id: after
    action: ok
"#;
    let (flaky, calls) = FlakyAction::new(u32::MAX, json!(null));
    let (engine, _) = engine_with(vec![
        ("flaky", Arc::new(flaky)),
        ("ok", Arc::new(EchoParams)),
    ]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert!(!result.success);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(result.steps[0].status, StepStatus::Error);
    assert!(result.steps[0].error.as_deref().unwrap().contains("2 attempts"));
    assert_eq!(result.steps[1].status, StepStatus::Skipped);
}

#[tokio::test]
async fn unknown_action_is_a_step_failure_not_a_load_failure() {
    let yaml = r#"
steps:
  - id: ghost
    action: does_not_exist
    on_error: continue
  - id: after
    action: ok
"#;
    let (engine, _) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert_eq!(result.steps[0].status, StepStatus::Error);
    assert!(result.steps[0].error.as_deref().unwrap().contains("unknown action"));
    assert_eq!(result.steps[1].status, StepStatus::Success);
}

#[tokio::test]
async fn output_bindings_flow_to_later_steps() {
    let yaml = r#"
steps:
  - id: produce
    action: produce
    output: artifact
  - id: consume
    action: ok
    params:
      target: "${artifact}"
"#;
    let (produce, _) = FlakyAction::new(0, json!("build-77"));
    let (engine, _) = engine_with(vec![
        ("produce", Arc::new(produce)),
        ("ok", Arc::new(EchoParams)),
    ]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.steps[1].output, Some(json!({"target": "build-77"})));
}

#[tokio::test]
async fn reference_to_failed_steps_output_is_governed_by_own_policy() {
    let yaml = r#"
steps:
  - id: produce
    action: boom
    on_error: continue
    output: artifact
  - id: consume
    action: ok
    params:
      target: "${artifact}"
"#;
    let (boom, _) = FlakyAction::new(u32::MAX, json!(null));
    let (engine, _) = engine_with(vec![
        ("boom", Arc::new(boom)),
        ("ok", Arc::new(EchoParams)),
    ]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();

    assert_eq!(result.steps[1].status, StepStatus::Error);
    assert!(result.steps[1].error.as_deref().unwrap().contains("artifact"));
}
