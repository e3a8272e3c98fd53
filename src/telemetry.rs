// src/telemetry.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber for a binary.
///
/// `RUST_LOG` wins over `default_filter`. `LOG_FORMAT=json` switches to JSON lines,
/// anything else gives compact human output. Logs go to stderr so stdout stays
/// free for rendered output. Safe to call more than once.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
}
