use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs to stderr. `--verbose` shows this crate's debug events; otherwise
/// `RUST_LOG` applies, falling back to warnings only.
pub fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("json_node=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).without_time().with_target(false))
        .with(filter)
        .init();
}
