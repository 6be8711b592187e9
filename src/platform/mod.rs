use std::path::{Path, PathBuf};

/// Platform-specific operations abstracted behind a common interface.
/// Each OS provides its own `NativePlatform` implementation so call sites
/// remain free of `#[cfg]` blocks.
pub trait Platform {
    /// Build a **tokio** `Command` that runs an inline shell string.
    fn shell_inline(command: &str) -> tokio::process::Command;

    /// Send a termination signal to the process identified by `pid`.
    fn kill_process(pid: &str) -> std::io::Result<std::process::Output>;

    /// Whether a process with the given pid is currently alive.
    fn process_alive(pid: &str) -> bool;

    /// Spawn a child that tails / follows a log file.
    fn tail_file(path: &Path) -> std::io::Result<std::process::Child>;

    /// Set restrictive *directory* permissions (0o700 on Unix, no-op on Windows).
    fn restrict_dir_permissions(path: &Path);

    /// Set restrictive *file* permissions (0o600 on Unix, no-op on Windows).
    fn restrict_file_permissions(path: &Path);

    /// Root data directory for cadence.
    /// Unix: `~/.cadence`, Windows: `%APPDATA%\cadence`.
    fn data_dir() -> PathBuf;
}

/// The conventional data directory, unless `CADENCE_HOME` points elsewhere.
pub fn resolve_data_dir(conventional: PathBuf) -> PathBuf {
    match std::env::var_os("CADENCE_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => conventional,
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
