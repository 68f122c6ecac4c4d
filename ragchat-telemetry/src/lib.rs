//! # ragchat-telemetry
//!
//! Logging setup for ragchat binaries, plus an in-memory event recorder for
//! tests.
//!
//! Every initialiser honours `RUST_LOG`; without it the given default
//! directive applies (`info` for [`init_telemetry`]).
//!
//! ```rust,no_run
//! ragchat_telemetry::init_telemetry("ragchat").expect("logging already initialised");
//! tracing::info!(files = 2, "ingesting");
//! ```

pub mod capture;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use capture::{CaptureLayer, CapturedEvent, EventStore};

/// Returned when a global subscriber is already installed.
#[derive(Debug, thiserror::Error)]
#[error("failed to initialise telemetry: {0}")]
pub struct TelemetryError(String);

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable subscriber at `info` level.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_with_level(service_name, "info", false)
}

/// Install a subscriber that writes one JSON object per event.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_with_level(service_name, "info", true)
}

/// Install a subscriber with an explicit default directive, e.g. `"debug"` or
/// `"ragchat_rag=trace,info"`.
///
/// Output goes to stderr so it never mixes with chat replies on stdout.
pub fn init_with_level(
    service_name: &str,
    default_directive: &str,
    json: bool,
) -> Result<(), TelemetryError> {
    let filter = env_filter(default_directive);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TelemetryError(e.to_string()))?;

    tracing::debug!(service = service_name, json, "telemetry initialised");
    Ok(())
}
