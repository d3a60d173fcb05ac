//! ## drillhund-telemetry::logging
//! **Structured logging with tracing**
//!
//! One `init_with_level` call at process start wires the `tracing`
//! subscriber with an env-filter; `log_event` records drill lifecycle events
//! (fallback activation, session outcomes) with structured metadata.

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Initializes the global subscriber with an explicit default level,
    /// still overridable through `RUST_LOG`.
    pub fn init_with_level(level: &str) {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .init()
    }

    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "drill_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );

        async {
            tracing::info!(
                metadata = ?metadata,
                "Drill event occurred"
            );
        }
        .instrument(span)
        .await
    }
}
