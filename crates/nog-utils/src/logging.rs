//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log output format (`json` or plain text)
pub const LOG_FORMAT_ENV: &str = "NOG_LOG_FORMAT";

/// Initialize tracing subscriber with default configuration
///
/// Filtering follows `RUST_LOG` and falls back to `info`. Setting
/// `NOG_LOG_FORMAT=json` switches to one JSON object per event, which is what
/// the external scheduler collects.
pub fn init_tracing() {
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let (plain_layer, json_layer) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(plain_layer)
        .with(json_layer)
        .init();
}
