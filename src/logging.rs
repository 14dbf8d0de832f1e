use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with console output plus a durable process log.
///
/// Per-message and per-attachment failures are only surfaced here, so the
/// file log is what makes them inspectable after the run.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "process.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("inventory_handler=info".parse().expect("static directive")),
        )
        .with(file_layer)
        .with(console_layer)
        .init();

    // keep the guard alive so buffered log lines flush on exit
    std::mem::forget(guard);
}
