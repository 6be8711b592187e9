use anyhow::Result;
use console::style;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::engine::prompt::TerminalPrompt;
use crate::core::engine::{PresetEngine, RunOptions, RunResult, StepStatus, TriggerType};
use crate::core::terminal::{GuideSection, print_error};

use super::AppContext;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RunCommandArgs {
    pub preset: Option<String>,
    pub overrides: Vec<(String, String)>,
    pub dry_run: bool,
    pub verbose: bool,
}

pub(crate) fn parse_run_command_args(args: &[String], start: usize) -> Result<RunCommandArgs, String> {
    let mut parsed = RunCommandArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--dry-run" => {
                parsed.dry_run = true;
                i += 1;
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
                i += 1;
            }
            "--var" => {
                if i + 1 < args.len() {
                    let Some((name, value)) = args[i + 1].split_once('=') else {
                        return Err(format!(
                            "invalid --var '{}' (expected name=value)",
                            args[i + 1]
                        ));
                    };
                    parsed
                        .overrides
                        .push((name.to_string(), value.to_string()));
                    i += 2;
                } else {
                    return Err("--var requires a name=value argument".to_string());
                }
            }
            other if parsed.preset.is_none() && !other.starts_with('-') => {
                parsed.preset = Some(other.to_string());
                i += 1;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(parsed)
}

pub async fn run_preset_command(ctx: &AppContext, args: &[String]) -> Result<()> {
    let parsed = match parse_run_command_args(args, 2) {
        Ok(parsed) => parsed,
        Err(e) => {
            print_error(&e);
            std::process::exit(2);
        }
    };
    let Some(name) = parsed.preset else {
        print_error("Usage: cadence run <preset> [--var name=value]... [--dry-run] [--verbose]");
        std::process::exit(2);
    };

    let preset = ctx.presets.load(&name).await?;
    let engine = PresetEngine::new(Arc::clone(&ctx.registry), Arc::clone(&ctx.history));

    // Ctrl+C cancels at the next step boundary so the run row still reaches
    // a terminal status.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let opts = RunOptions {
        dry_run: parsed.dry_run,
        overrides: parsed.overrides.into_iter().collect::<HashMap<_, _>>(),
        verbose: parsed.verbose,
        trigger: TriggerType::Manual,
        prompt: Arc::new(TerminalPrompt),
        cancel,
    };

    let result = engine.run(&preset, &opts).await?;
    print_run_result(&preset.name, &result, parsed.dry_run);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_run_result(preset_name: &str, result: &RunResult, dry_run: bool) {
    let title = if dry_run {
        format!("Dry-run: {}", preset_name)
    } else {
        format!("Run: {}", preset_name)
    };
    let mut section = GuideSection::new(&title);
    for outcome in &result.steps {
        let line = match outcome.status {
            StepStatus::Success => format!(
                "{} {} ({} ms)",
                style("ok").green().bold(),
                outcome.step_name,
                outcome.duration_ms
            ),
            StepStatus::Skipped => format!(
                "{} {}",
                style("skipped").yellow(),
                outcome.step_name
            ),
            StepStatus::Error => format!(
                "{} {}: {}",
                style("failed").red().bold(),
                outcome.step_name,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        };
        section = section.text(&line);
    }
    section = section.blank();
    let verdict = if result.success {
        style("SUCCESS").green().bold().to_string()
    } else {
        style("FAILED").red().bold().to_string()
    };
    section = section.status(
        "Result",
        &format!("{} in {} ms", verdict, result.total_duration_ms),
    );
    if let Some(run_id) = result.run_id {
        section = section.status("Run id", &run_id.to_string());
    }
    section.print();
    println!();
}
