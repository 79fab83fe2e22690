//! Tracing setup: console output plus an appended run log file.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Level comes from `RUST_LOG`, default `info`.
///
/// The console layer is always installed. If `log_file` cannot be opened the
/// run logs to the console only and the open error is returned.
pub fn init(log_file: &Path) -> io::Result<()> {
    let (file, open_error) = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file))
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    match open_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
