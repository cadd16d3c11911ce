//! Logging setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG`, every `flagquiz*` crate and the binary log at
/// `default_level`.
///
/// ```no_run
/// flagquiz::logging::setup_logger("flagquiz_server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_level: &str) {
    let default_filter = [
        "flagquiz",
        "flagquiz_room",
        "flagquiz_protocol",
        "flagquiz_transport",
        binary_name,
    ]
    .iter()
    .map(|target| format!("{target}={default_level}"))
    .collect::<Vec<_>>()
    .join(",");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
