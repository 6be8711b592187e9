mod daemon;
mod presets;
mod run;
mod schedule;
mod tasks;

use anyhow::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::actions::{ActionRegistry, builtin};
use crate::core::config::Config;
use crate::core::history::HistoryStore;
use crate::core::preset::PresetStore;
use crate::core::terminal::{self, GuideSection, print_error};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("run <preset>", "Run a preset now (--var, --dry-run)")
        .command("presets list|show", "Inspect available presets")
        .command("actions", "List registered actions")
        .print();

    GuideSection::new("Scheduling")
        .command("schedule add <preset>", "Schedule a preset (--cron / --every)")
        .command("schedule list", "Show scheduled tasks")
        .command("schedule enable|disable|remove", "Manage a task by id")
        .print();

    GuideSection::new("Daemon")
        .command("daemon start|stop|status", "Manage the background scheduler")
        .command("daemon logs", "Follow scheduler output")
        .command("daemon install|uninstall", "Manage the systemd user unit")
        .print();

    GuideSection::new("History")
        .command("tasks list|show", "Inspect recorded runs")
        .command("history prune", "Delete runs past the retention window")
        .print();

    println!(
        "\n {} {} <command> [subcommand]\n",
        style("Usage:").bold(),
        style("cadence").green()
    );
}

/// Shared handles every command operates on. Built once per invocation;
/// the daemon loop reuses the same wiring.
pub(crate) struct AppContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub history: Arc<HistoryStore>,
    pub presets: Arc<PresetStore>,
    pub registry: Arc<ActionRegistry>,
}

impl AppContext {
    pub async fn init() -> Result<Self> {
        let data_dir = NativePlatform::data_dir();
        let config = Config::load(&data_dir).await?;
        let history = Arc::new(HistoryStore::new(&data_dir)?);
        let presets = Arc::new(PresetStore::new(config.presets_dir(&data_dir)));

        let mut registry = ActionRegistry::new();
        builtin::register_defaults(&mut registry);

        Ok(Self {
            data_dir,
            config,
            history,
            presets,
            registry: Arc::new(registry),
        })
    }
}

fn print_actions(registry: &ActionRegistry) {
    for group in registry.catalog() {
        let title = if group.description.is_empty() {
            group.prefix.clone()
        } else {
            format!("{} — {}", group.prefix, group.description)
        };
        let mut section = GuideSection::new(&title);
        for action in &group.actions {
            section = section.command(&action.action, &action.description);
            for param in &action.params {
                let requirement = if param.required { "required" } else { "optional" };
                section = section.text(&format!(
                    "    --{} ({}) {}",
                    param.name, requirement, param.description
                ));
            }
        }
        section.print();
    }
    println!();
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    crate::logging::init(verbose);

    let run_dir = NativePlatform::data_dir().join("run");
    let pid_file = run_dir.join("cadence.pid");

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "run" => {
            let ctx = AppContext::init().await?;
            run::run_preset_command(&ctx, &args).await?;
        }
        "presets" => {
            let ctx = AppContext::init().await?;
            presets::run_presets_command(&ctx, &args).await?;
        }
        "actions" => {
            let ctx = AppContext::init().await?;
            print_actions(&ctx.registry);
        }
        "tasks" => {
            let ctx = AppContext::init().await?;
            tasks::run_tasks_command(&ctx, &args).await?;
        }
        "history" => {
            let sub_cmd = if args.len() > 2 { args[2].as_str() } else { "" };
            if sub_cmd == "prune" {
                let ctx = AppContext::init().await?;
                tasks::run_history_prune(&ctx, &args).await?;
            } else {
                print_error("Unknown or missing history command. Expected: prune");
                print_help();
            }
        }
        "schedule" => {
            let ctx = AppContext::init().await?;
            schedule::run_schedule_command(&ctx, &args).await?;
        }
        "daemon" => {
            let sub_cmd = if args.len() > 2 { args[2].as_str() } else { "" };
            match sub_cmd {
                "start" => daemon::daemon_start(&run_dir, &pid_file).await?,
                "stop" => daemon::daemon_stop(&pid_file).await?,
                "status" => {
                    let ctx = AppContext::init().await?;
                    daemon::daemon_status(&pid_file, &ctx).await?;
                }
                "logs" => daemon::follow_logs(&run_dir, &pid_file).await?,
                "install" => daemon::daemon_install().await?,
                "uninstall" => daemon::daemon_uninstall().await?,
                "run-loop" => {
                    let ctx = AppContext::init().await?;
                    daemon::daemon_run_loop(&ctx).await?;
                }
                _ => {
                    print_error(
                        "Unknown or missing daemon command. Expected: start, stop, status, logs, install, uninstall, run-loop",
                    );
                    print_help();
                }
            }
        }
        "help" | "--help" | "-h" => print_help(),
        cmd => {
            print_error(&format!("Unknown command: {}", cmd));
            print_help();
        }
    }
    Ok(())
}
