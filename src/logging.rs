use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Initialize structured logging for the process. `RUST_LOG` wins when set;
/// otherwise the crate logs at info, or debug with `--verbose`.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "cadence=debug" } else { "cadence=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok(); // Ignore err when re-entered
}
