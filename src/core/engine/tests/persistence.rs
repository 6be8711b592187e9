use super::*;
use crate::core::engine::types::{RunOptions, TriggerType};
use crate::core::history::RunStatus;
use serde_json::json;

#[tokio::test]
async fn completed_run_has_terminal_status_and_full_logs() {
    let yaml = r#"
steps:
  - id: one
    action: ok
  - id: two
    action: boom
  - id: three
    action: ok
"#;
    let (boom, _) = FlakyAction::new(u32::MAX, json!(null));
    let (engine, history) = engine_with(vec![
        ("ok", Arc::new(EchoParams)),
        ("boom", Arc::new(boom)),
    ]);
    let result = engine.run(&preset(yaml), &RunOptions::default()).await.unwrap();
    let run_id = result.run_id.unwrap();

    let run = history.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Error);
    assert_eq!(run.step_count, 3);
    assert!(run.error.as_deref().unwrap().contains("flaky failure"));
    assert!(run.duration_ms.is_some());

    // Every step gets a log row, the post-stop skipped one included.
    let logs = history.get_run_logs(run_id).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].status, "success");
    assert_eq!(logs[1].status, "error");
    assert_eq!(logs[2].status, "skipped");
    assert_eq!(logs[2].step_index, 2);
}

#[tokio::test]
async fn dry_run_is_persisted_with_skipped_logs() {
    let yaml = r#"
steps:
  - id: one
    action: anything
"#;
    let (engine, history) = engine_with(vec![]);
    let opts = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let result = engine.run(&preset(yaml), &opts).await.unwrap();

    let run = history.get_run(result.run_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Success);
    let logs = history.get_run_logs(run.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "skipped");
}

#[tokio::test]
async fn trigger_type_is_recorded() {
    let yaml = r#"
steps:
  - id: one
    action: ok
"#;
    let (engine, history) = engine_with(vec![("ok", Arc::new(EchoParams))]);
    let opts = RunOptions {
        trigger: TriggerType::Scheduled,
        ..RunOptions::default()
    };
    let result = engine.run(&preset(yaml), &opts).await.unwrap();
    let run = history.get_run(result.run_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(run.trigger_type, "scheduled");
}
