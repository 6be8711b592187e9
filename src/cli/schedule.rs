use anyhow::Result;
use chrono::Utc;
use console::style;

use crate::core::daemon::trigger::Trigger;
use crate::core::terminal::{GuideSection, print_error, print_info, print_success};

use super::AppContext;

pub async fn run_schedule_command(ctx: &AppContext, args: &[String]) -> Result<()> {
    let sub_cmd = if args.len() > 2 { args[2].as_str() } else { "" };
    match sub_cmd {
        "add" => add_task(ctx, args).await,
        "list" | "" => list_tasks(ctx).await,
        "enable" => set_enabled(ctx, args, true).await,
        "disable" => set_enabled(ctx, args, false).await,
        "remove" => remove_task(ctx, args).await,
        other => {
            print_error(&format!(
                "Unknown schedule command '{}'. Expected: add, list, enable, disable, remove",
                other
            ));
            Ok(())
        }
    }
}

async fn add_task(ctx: &AppContext, args: &[String]) -> Result<()> {
    let mut preset_name: Option<String> = None;
    let mut trigger_expr: Option<String> = None;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--cron" => {
                if i + 1 < args.len() {
                    trigger_expr = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--every" => {
                if i + 1 < args.len() {
                    trigger_expr = Some(format!("@every {}", args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            other if preset_name.is_none() && !other.starts_with('-') => {
                preset_name = Some(other.to_string());
                i += 1;
            }
            _ => i += 1,
        }
    }

    let (Some(preset_name), Some(trigger_expr)) = (preset_name, trigger_expr) else {
        print_error("Usage: cadence schedule add <preset> --cron \"<expr>\" | --every <interval>");
        return Ok(());
    };

    let trigger: Trigger = match trigger_expr.parse() {
        Ok(trigger) => trigger,
        Err(e) => {
            print_error(&e);
            return Ok(());
        }
    };
    // Reject schedules for presets that do not exist (or no longer parse).
    let preset = ctx.presets.load(&preset_name).await?;

    let Some(next) = trigger.next_after(Utc::now()) else {
        print_error(&format!("'{}' never fires.", trigger_expr));
        return Ok(());
    };
    let task_id = ctx
        .history
        .add_task(&preset.name, &trigger_expr, next)
        .await?;
    print_success(&format!(
        "Scheduled '{}' as task {} (next run {}).",
        preset.name,
        task_id,
        next.to_rfc3339()
    ));
    Ok(())
}

async fn list_tasks(ctx: &AppContext) -> Result<()> {
    let tasks = ctx.history.list_tasks().await?;
    if tasks.is_empty() {
        print_info(&format!(
            "No scheduled tasks. Add one with {}",
            style("cadence schedule add <preset> --every 1h").cyan()
        ));
        return Ok(());
    }

    let mut section = GuideSection::new("Scheduled Tasks");
    for task in &tasks {
        let state = if task.enabled {
            style("enabled").green().to_string()
        } else {
            style("disabled").dim().to_string()
        };
        let next = task.next_run_at.as_deref().unwrap_or("-");
        let last = task
            .last_run_id
            .map(|id| format!(", last run #{}", id))
            .unwrap_or_default();
        section = section.command(
            &format!("#{} {}", task.id, task.preset_name),
            &format!("{} | {} | next {}{}", state, task.trigger, next, last),
        );
    }
    section.print();
    println!();
    Ok(())
}

async fn set_enabled(ctx: &AppContext, args: &[String], enabled: bool) -> Result<()> {
    let verb = if enabled { "enable" } else { "disable" };
    let Some(task_id) = args.get(3).and_then(|s| s.parse::<i64>().ok()) else {
        print_error(&format!("Usage: cadence schedule {} <task-id>", verb));
        return Ok(());
    };
    if ctx.history.set_task_enabled(task_id, enabled).await? {
        print_success(&format!("Task {} {}d.", task_id, verb));
    } else {
        print_error(&format!("No task with id {}", task_id));
    }
    Ok(())
}

async fn remove_task(ctx: &AppContext, args: &[String]) -> Result<()> {
    let Some(task_id) = args.get(3).and_then(|s| s.parse::<i64>().ok()) else {
        print_error("Usage: cadence schedule remove <task-id>");
        return Ok(());
    };
    if ctx.history.remove_task(task_id).await? {
        print_success(&format!("Task {} removed.", task_id));
    } else {
        print_error(&format!("No task with id {}", task_id));
    }
    Ok(())
}
