use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing on stderr. Stdout carries the request/response protocol
/// and must never see log lines.
///
/// Default level: `info,slidekit=debug`, override via `RUST_LOG`.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,slidekit=debug"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();

    tracing::debug!("Tracing initialized");
}
