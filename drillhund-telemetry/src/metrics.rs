//! ## drillhund-telemetry::metrics
//! **Prometheus recorder for the drill engine**
//!
//! Counts delivered events and fallback activations and tracks how many
//! deliveries are still queued, so a drained stream is visible from the
//! outside without poking at engine internals.

use prometheus::{Counter, Gauge, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub delivered_events: Counter,
    pub pending_deliveries: Gauge,
    pub fallback_activations: Counter,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let delivered_events = Counter::new(
            "drillhund_delivered_events_total",
            "Total events delivered into terminal channels",
        )
        .unwrap();
        let pending_deliveries = Gauge::new(
            "drillhund_pending_deliveries",
            "Scheduled deliveries not yet fired",
        )
        .unwrap();
        let fallback_activations = Counter::new(
            "drillhund_fallback_activations_total",
            "Times the built-in demo drill replaced a failed retrieval",
        )
        .unwrap();

        registry
            .register(Box::new(delivered_events.clone()))
            .unwrap();
        registry
            .register(Box::new(pending_deliveries.clone()))
            .unwrap();
        registry
            .register(Box::new(fallback_activations.clone()))
            .unwrap();

        Self {
            registry,
            delivered_events,
            pending_deliveries,
            fallback_activations,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    pub fn record_deliveries(&self, delivered: usize, pending: usize) {
        self.delivered_events.inc_by(delivered as f64);
        self.pending_deliveries.set(pending as f64);
    }
}
