use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "rmv_metrics.log";

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped, so the caller
/// must hold it until the run has finished. When the log directory cannot be
/// created or written, logging falls back to the console only.
pub fn init_logging() -> Option<WorkerGuard> {
    let (file_writer, guard) = match open_file_writer(Path::new(LOG_DIR)) {
        Ok((writer, guard)) => (Some(writer), Some(guard)),
        Err(e) => {
            eprintln!("file logging disabled: {}", e);
            (None, None)
        }
    };

    let file_layer = file_writer.map(|writer| fmt::layer().json().with_writer(writer));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rmv_metrics=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

/// Daily-rotated, non-blocking JSON log file under `dir`
pub fn open_file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory '{}': {}", dir.display(), e))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|e| format!("cannot open log file in '{}': {}", dir.display(), e))?;

    Ok(tracing_appender::non_blocking(appender))
}
