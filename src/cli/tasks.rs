use anyhow::Result;
use console::style;

use crate::core::history::RunStatus;
use crate::core::terminal::{GuideSection, print_error, print_info, print_success};

use super::AppContext;

pub async fn run_tasks_command(ctx: &AppContext, args: &[String]) -> Result<()> {
    let sub_cmd = if args.len() > 2 { args[2].as_str() } else { "" };
    match sub_cmd {
        "list" | "" => {
            let limit = parse_limit(args, 3).unwrap_or(20);
            list_runs(ctx, limit).await
        }
        "show" => {
            let Some(run_id) = args.get(3).and_then(|s| s.parse::<i64>().ok()) else {
                print_error("Usage: cadence tasks show <run-id>");
                return Ok(());
            };
            show_run(ctx, run_id).await
        }
        other => {
            print_error(&format!(
                "Unknown tasks command '{}'. Expected: list, show",
                other
            ));
            Ok(())
        }
    }
}

pub async fn run_history_prune(ctx: &AppContext, args: &[String]) -> Result<()> {
    let mut days = ctx.config.retention_days;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--days" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(n) => days = n,
                        Err(_) => {
                            print_error(&format!("Invalid --days value '{}'", args[i + 1]));
                            return Ok(());
                        }
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    let deleted = ctx.history.prune_older_than(days).await?;
    print_success(&format!(
        "Pruned {} run(s) older than {} days.",
        deleted, days
    ));
    Ok(())
}

fn parse_limit(args: &[String], start: usize) -> Option<usize> {
    let mut i = start;
    while i < args.len() {
        if (args[i] == "-n" || args[i] == "--limit") && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
        i += 1;
    }
    None
}

fn styled_status(status: RunStatus) -> String {
    match status {
        RunStatus::Running => style("running").yellow().to_string(),
        RunStatus::Success => style("success").green().to_string(),
        RunStatus::Error => style("error").red().to_string(),
    }
}

async fn list_runs(ctx: &AppContext, limit: usize) -> Result<()> {
    let runs = ctx.history.list_runs(limit).await?;
    if runs.is_empty() {
        print_info("No runs recorded yet.");
        return Ok(());
    }

    let mut section = GuideSection::new("Recent Runs");
    for run in &runs {
        let duration = run
            .duration_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());
        section = section.command(
            &format!("#{} {}", run.id, run.preset_name),
            &format!(
                "{} | {} | {} | {}",
                styled_status(run.status),
                run.trigger_type,
                run.started_at,
                duration
            ),
        );
    }
    section.print();
    println!();
    Ok(())
}

async fn show_run(ctx: &AppContext, run_id: i64) -> Result<()> {
    let Some(run) = ctx.history.get_run(run_id).await? else {
        print_error(&format!("No run with id {}", run_id));
        return Ok(());
    };

    let mut section = GuideSection::new(&format!("Run #{}: {}", run.id, run.preset_name))
        .status("Status", &styled_status(run.status))
        .status("Trigger", &run.trigger_type)
        .status("Started", &run.started_at);
    if let Some(ms) = run.duration_ms {
        section = section.status("Duration", &format!("{} ms", ms));
    }
    if let Some(error) = &run.error {
        section = section.status("Error", &style(error).red().to_string());
    }

    let logs = ctx.history.get_run_logs(run_id).await?;
    if !logs.is_empty() {
        section = section.blank().text(&style("Steps").bold().to_string());
        for log in &logs {
            let mut detail = format!("{} | {} | {} ms", log.action, log.status, log.duration_ms);
            if let Some(error) = &log.error {
                detail.push_str(&format!(" | {}", error));
            }
            section = section.command(
                &format!("{}. {}", log.step_index + 1, log.step_name),
                &detail,
            );
        }
    }
    section.print();
    println!();
    Ok(())
}
