use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::daemon::Daemon;
use crate::core::engine::PresetEngine;
use crate::core::notify::Notifier;
use crate::core::terminal::{GuideSection, print_error, print_info, print_success, print_warn};
use crate::platform::{NativePlatform, Platform};

use super::AppContext;

pub async fn daemon_start(run_dir: &Path, pid_file: &Path) -> Result<()> {
    std::fs::create_dir_all(run_dir)?;
    NativePlatform::restrict_dir_permissions(run_dir);
    if let Ok(pid_str) = std::fs::read_to_string(pid_file) {
        let pid = pid_str.trim();
        if !pid.is_empty() && NativePlatform::process_alive(pid) {
            print_warn("Daemon is already running. Use 'cadence daemon stop' first.");
            return Ok(());
        }
        // Leftover from a daemon that died without cleaning up.
        print_info(&format!("Removing stale pid file (PID {} is gone).", pid));
        std::fs::remove_file(pid_file)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(run_dir.join("cadence.log"))?;

    let exe = std::env::current_exe()?;
    let child = std::process::Command::new(exe)
        .arg("daemon")
        .arg("run-loop")
        .stdin(std::process::Stdio::null())
        .stdout(log_file.try_clone()?)
        .stderr(log_file)
        .spawn()?;

    std::fs::write(pid_file, child.id().to_string())?;

    GuideSection::new("Daemon Started")
        .status(
            "Status",
            &format!(
                "{} (PID {})",
                style("RUNNING").green().bold(),
                style(child.id()).dim()
            ),
        )
        .blank()
        .info(&format!(
            "Run {} to follow the scheduler output.",
            style("cadence daemon logs").cyan().bold()
        ))
        .print();
    println!();

    Ok(())
}

pub async fn daemon_stop(pid_file: &Path) -> Result<()> {
    let mut daemon_stopped = false;
    if pid_file.exists() {
        if let Ok(pid_str) = std::fs::read_to_string(pid_file) {
            let pid = pid_str.trim();
            if !pid.is_empty() {
                let _ = NativePlatform::kill_process(pid);
                GuideSection::new("Daemon Stopped")
                    .status(
                        "Status",
                        &format!(
                            "{} (was PID {})",
                            style("STOPPED").red().bold(),
                            style(pid).dim()
                        ),
                    )
                    .print();
                daemon_stopped = true;
            }
        }
        std::fs::remove_file(pid_file).ok();
    }

    if !daemon_stopped {
        print_info("Daemon is not currently running.");
    }

    println!();
    Ok(())
}

pub async fn daemon_status(pid_file: &Path, ctx: &AppContext) -> Result<()> {
    if pid_file.exists() {
        let pid_str = std::fs::read_to_string(pid_file)?;
        let enabled = ctx.history.enabled_tasks().await?;
        GuideSection::new("Daemon Status")
            .status(
                "Daemon",
                &format!(
                    "{} (PID {})",
                    style("RUNNING").green().bold(),
                    style(pid_str.trim()).dim()
                ),
            )
            .status("Enabled tasks", &enabled.len().to_string())
            .print();
    } else {
        GuideSection::new("Daemon Status")
            .status("Daemon", &style("STOPPED").red().bold().to_string())
            .blank()
            .info(&format!(
                "Run {} to start the scheduler.",
                style("cadence daemon start").cyan().bold()
            ))
            .print();
    }
    println!();
    Ok(())
}

pub async fn follow_logs(run_dir: &Path, pid_file: &Path) -> Result<()> {
    if pid_file.exists() && std::fs::read_to_string(pid_file).is_ok() {
        let log_file = run_dir.join("cadence.log");
        if log_file.exists() {
            GuideSection::new("Live Logs")
                .text(&format!(
                    "Following {} - press {} to stop.",
                    style("cadence.log").cyan(),
                    style("Ctrl+C").bold().yellow()
                ))
                .print();
            println!();
            let mut child = NativePlatform::tail_file(&log_file)?;
            let _ = child.wait()?;
        } else {
            print_error(&format!(
                "Log file not found at {}",
                style(log_file.display()).dim()
            ));
        }
    } else {
        GuideSection::new("Live Logs")
            .warn("Daemon is not running.")
            .blank()
            .info(&format!(
                "Run {} to start it.",
                style("cadence daemon start").cyan().bold()
            ))
            .print();
        println!();
    }
    Ok(())
}

/// The foreground scheduler loop the detached daemon process runs.
pub async fn daemon_run_loop(ctx: &AppContext) -> Result<()> {
    let engine = Arc::new(PresetEngine::new(
        Arc::clone(&ctx.registry),
        Arc::clone(&ctx.history),
    ));
    let notifier = Arc::new(Notifier::new(ctx.config.notify_command.clone()));
    let daemon = Daemon::new(
        engine,
        Arc::clone(&ctx.presets),
        Arc::clone(&ctx.history),
        notifier,
        &ctx.config,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    daemon.run(shutdown).await
}

fn unit_file_contents() -> Result<String> {
    let exe = std::env::current_exe()?;
    Ok(format!(
        "[Unit]\nDescription=cadence preset scheduler\n\n[Service]\nExecStart={} daemon run-loop\nRestart=on-failure\n\n[Install]\nWantedBy=default.target\n",
        exe.display()
    ))
}

pub async fn daemon_install() -> Result<()> {
    if !cfg!(unix) {
        print_warn("Service installation is only supported on systemd platforms.");
        return Ok(());
    }
    let Some(config_dir) = dirs::config_dir() else {
        print_error("Could not determine the user config directory.");
        return Ok(());
    };
    let unit_dir = config_dir.join("systemd").join("user");
    std::fs::create_dir_all(&unit_dir)?;
    let unit_path = unit_dir.join("cadence.service");
    std::fs::write(&unit_path, unit_file_contents()?)?;

    print_success(&format!("Wrote {}", unit_path.display()));
    GuideSection::new("Next Steps")
        .command("systemctl --user daemon-reload", "Pick up the new unit")
        .command(
            "systemctl --user enable --now cadence",
            "Start the scheduler at login",
        )
        .print();
    println!();
    Ok(())
}

pub async fn daemon_uninstall() -> Result<()> {
    if !cfg!(unix) {
        print_warn("Service installation is only supported on systemd platforms.");
        return Ok(());
    }
    let Some(config_dir) = dirs::config_dir() else {
        print_error("Could not determine the user config directory.");
        return Ok(());
    };
    let unit_path = config_dir.join("systemd").join("user").join("cadence.service");
    if unit_path.exists() {
        std::fs::remove_file(&unit_path)?;
        print_success(&format!("Removed {}", unit_path.display()));
        print_info("Run 'systemctl --user daemon-reload' to finish.");
    } else {
        print_info("No service unit installed.");
    }
    Ok(())
}
