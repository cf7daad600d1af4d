use anyhow::Context;
use configuration::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "tradebook.log";

/// Keeps the background log writer alive. Buffered lines are flushed when it
/// is dropped, so hold it for the lifetime of the process.
#[must_use]
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`. Output always goes to stdout; when
/// `logging.directory` is set it is also written to a daily rolling file there.
pub fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<TelemetryGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .with_context(|| format!("invalid log filter '{}'", settings.level))?;

    let (file_layer, file_guard) = match &settings.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(level = %settings.level, file = settings.directory.is_some(), "Tracing initialized.");
    Ok(TelemetryGuard { _file: file_guard })
}
