use std::{fs, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter, prelude::*, EnvFilter};

/// Target of the protocol event log (`EVENT:*` lines).
pub const CONSENSUS_TARGET: &str = "consensus";

/// Installs the global subscriber: human logs on stdout, protocol events in
/// `logs/consensus-<run_name>.log`.
///
/// The returned guard flushes the file writer and must be kept alive for the
/// whole run.
pub fn init_tracing(run_name: &str) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let log_dir = Path::new("logs");
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, format!("consensus-{}.log", run_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|metadata| metadata.target() == CONSENSUS_TARGET));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,benor_node=debug".into()))
        .with_filter(filter::filter_fn(|metadata| metadata.target() != CONSENSUS_TARGET));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(guard)
}
