use anyhow::{anyhow, Result};
use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing. Logs go to stderr, or to daily rotating files under
/// `LOG_DIR` when it is set. The returned guard must live until exit.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = match env::var("LOG_DIR") {
        Ok(dir) => dir,
        Err(_) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {}", e))?;
            return Ok(None);
        }
    };
    let log_file_prefix =
        env::var("LOG_FILE_PREFIX").unwrap_or_else(|_| "memo-storage".to_string());

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow!("Failed to create log directory '{}': {}", log_dir, e))?;

    let file_appender = rolling::daily(&log_dir, &log_file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    info!(
        "📝 Logging to daily rotating files: {}/{}.<YYYY-MM-DD>",
        log_dir, log_file_prefix
    );
    Ok(Some(guard))
}
