//! Tracing initialization: one fmt layer (level, target, thread id, span close events) writing to
//! stdout and, when a log file is given, to that file as well.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, fmt::writer::MakeWriterExt, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Registry,
};

/// Installs the global tracing subscriber.
///
/// The level comes from `RUST_LOG` (default `info`), so `.env` must be loaded before calling this.
/// When `log_file_path` is set, its parent directory is created and lines are appended to the file.
pub fn init_tracing(log_file_path: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    let registry = Registry::default().with(env_filter);

    match log_file_path {
        Some(path) => {
            if let Some(dir) = Path::new(path).parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            let file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);
            registry
                .with(layer.with_writer(io::stdout.and(file)))
                .try_init()
        }
        None => registry.with(layer.with_writer(io::stdout)).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
