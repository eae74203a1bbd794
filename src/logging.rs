//! Logging setup: console output plus a persistent debug.log copy

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE: &str = "debug.log";

/// Install the global subscriber.
///
/// One level filter (RUST_LOG, default "info") gates the whole subscriber;
/// below it, events fan out to human-readable console output and a
/// non-blocking, ANSI-free copy in debug.log.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the process.
#[must_use]
pub fn init_logging() -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", LOG_FILE));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    guard
}
