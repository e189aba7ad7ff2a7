use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::filter_fn, prelude::*, EnvFilter};

use crate::error::NodeError;

/// Target carrying the `EVENT:*` consensus milestones.
pub const CONSENSUS_TARGET: &str = "consensus";

pub const CONSENSUS_LOG: &str = "consensus.log";

/// Installs the global subscriber: human logs on stdout, consensus events in
/// `<log_dir>/consensus.log`. Keep the returned guard alive until exit or the
/// file writer stops flushing.
pub fn init(log_dir: &Path) -> Result<WorkerGuard, NodeError> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, CONSENSUS_LOG);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter_fn(|metadata| metadata.target() == CONSENSUS_TARGET));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,liars_node=debug".into()),
        )
        .with_filter(filter_fn(|metadata| metadata.target() != CONSENSUS_TARGET));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(guard)
}
