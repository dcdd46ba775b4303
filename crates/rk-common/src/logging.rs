//! Structured Logging Configuration
//!
//! - `LOG_FORMAT=json` emits one JSON object per event (log aggregation)
//! - any other value emits human-readable text (local development)
//! - `RUST_LOG` controls filtering, defaulting to `info`
//!   (e.g. `RUST_LOG=rk_platform=debug,tower_http=info`)
//!
//! ```rust,ignore
//! rk_common::logging::init_logging("rk-server");
//! tracing::info!(role_id = %id, "Role created");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value. Only "json" (any case) selects JSON.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

/// Initialize the global subscriber for `service_name`.
///
/// Calling this more than once is harmless: later calls keep the first
/// subscriber and only log that initialization was skipped.
pub fn init_logging(service_name: &str) {
    let format = LogFormat::from_env();
    let env_filter = build_filter();

    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .flatten_event(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::info!(service = service_name, ?format, "Logging initialized");
    } else {
        tracing::debug!(service = service_name, "Logging already initialized");
    }
}

fn build_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
