use anyhow::Result;
use console::style;

use crate::core::terminal::{GuideSection, print_error, print_info};

use super::AppContext;

pub async fn run_presets_command(ctx: &AppContext, args: &[String]) -> Result<()> {
    let sub_cmd = if args.len() > 2 { args[2].as_str() } else { "" };
    match sub_cmd {
        "list" | "" => list_presets(ctx).await,
        "show" => {
            let Some(name) = args.get(3) else {
                print_error("Usage: cadence presets show <name>");
                return Ok(());
            };
            show_preset(ctx, name).await
        }
        other => {
            print_error(&format!(
                "Unknown presets command '{}'. Expected: list, show",
                other
            ));
            Ok(())
        }
    }
}

async fn list_presets(ctx: &AppContext) -> Result<()> {
    let presets = ctx.presets.list().await?;
    if presets.is_empty() {
        print_info(&format!(
            "No presets found. Drop YAML files into {}",
            style(ctx.config.presets_dir(&ctx.data_dir).display()).cyan()
        ));
        return Ok(());
    }

    let mut section = GuideSection::new("Presets");
    for preset in &presets {
        let stats = ctx.history.preset_stats(&preset.name).await?;
        let summary = format!(
            "{} ({} steps, {} runs{})",
            preset.description.as_deref().unwrap_or("no description"),
            preset.steps.len(),
            stats.run_count,
            match &stats.last_run_at {
                Some(at) => format!(", last {}", at),
                None => String::new(),
            }
        );
        section = section.command(&preset.name, &summary);
    }
    section.print();
    println!();
    Ok(())
}

async fn show_preset(ctx: &AppContext, name: &str) -> Result<()> {
    let preset = ctx.presets.load(name).await?;
    let stats = ctx.history.preset_stats(&preset.name).await?;

    let mut section = GuideSection::new(&format!("Preset: {}", preset.name));
    if let Some(description) = &preset.description {
        section = section.text(description).blank();
    }
    if !preset.vars.is_empty() {
        section = section.text(&style("Variables").bold().to_string());
        for var in &preset.vars {
            let mut details = vec![var.var_type.as_str().to_string()];
            if var.required {
                details.push("required".to_string());
            }
            if let Some(default) = &var.default {
                details.push(format!("default: {}", default));
            }
            section = section.command(&var.name, &details.join(", "));
        }
        section = section.blank();
    }
    section = section.text(&style("Steps").bold().to_string());
    for (index, step) in preset.steps.iter().enumerate() {
        let mut details = vec![step.action.clone()];
        if step.interactive {
            details.push("interactive".to_string());
        }
        details.push(format!("on_error: {}", step.on_error));
        if let Some(output) = &step.output {
            details.push(format!("output: {}", output));
        }
        section = section.command(
            &format!("{}. {}", index + 1, step.display_name()),
            &details.join(", "),
        );
    }
    section = section.blank().status("Runs", &stats.run_count.to_string());
    if let Some(at) = &stats.last_run_at {
        section = section.status("Last run", at);
    }
    section.print();
    println!();
    Ok(())
}
