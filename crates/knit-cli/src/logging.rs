//! Diagnostics for the `knit` binary.
//!
//! Reads `RUST_LOG`; defaults to `info`. Output goes to stderr so the status
//! JSON on stdout stays machine readable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
