//! Tracing subscriber bootstrap for binaries embedding the crate.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging (M-LOG-STRUCTURED).
///
/// Respects `RUST_LOG`, defaulting to `info`. Call once at startup; a second
/// call is a no-op failure that is deliberately ignored so tests can race.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();
}
