//! # Prometheus Metrics
//!
//! Operational metrics for the ledger service, scraped at `/metrics` on
//! the dedicated metrics port. All metrics live in their own
//! [`prometheus::Registry`] so they never collide with a default global
//! registry consumer.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the service.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Registry that owns all metrics below.
    registry: Registry,
    /// Total contract calls dispatched, successful or not.
    pub calls_total: IntCounter,
    /// Contract calls that returned an error.
    pub calls_failed_total: IntCounter,
    /// Total credits minted across all batches.
    pub credits_minted_total: IntCounter,
    /// Purchases that settled (credits and payment both moved).
    pub purchases_settled_total: IntCounter,
    /// Listings currently active on the order book.
    pub active_listings: IntGauge,
    /// Histogram of contract call latency in seconds.
    pub call_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("verdant".into()), None)
            .expect("failed to create prometheus registry");

        let calls_total = IntCounter::new(
            "calls_total",
            "Total contract calls dispatched, successful or not",
        )
        .expect("metric creation");
        registry
            .register(Box::new(calls_total.clone()))
            .expect("metric registration");

        let calls_failed_total = IntCounter::new(
            "calls_failed_total",
            "Contract calls that returned an error",
        )
        .expect("metric creation");
        registry
            .register(Box::new(calls_failed_total.clone()))
            .expect("metric registration");

        let credits_minted_total = IntCounter::new(
            "credits_minted_total",
            "Total carbon credits minted across all batches",
        )
        .expect("metric creation");
        registry
            .register(Box::new(credits_minted_total.clone()))
            .expect("metric registration");

        let purchases_settled_total = IntCounter::new(
            "purchases_settled_total",
            "Purchases where credits and payment both settled",
        )
        .expect("metric creation");
        registry
            .register(Box::new(purchases_settled_total.clone()))
            .expect("metric registration");

        let active_listings =
            IntGauge::new("active_listings", "Listings currently active on the order book")
                .expect("metric creation");
        registry
            .register(Box::new(active_listings.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "End-to-end contract call latency in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            calls_total,
            calls_failed_total,
            credits_minted_total,
            purchases_settled_total,
            active_listings,
            call_latency_seconds,
        }
    }

    /// Encodes all registered metrics into Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler rendering `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_encode() {
        let metrics = LedgerMetrics::new();
        metrics.calls_total.inc();
        metrics.active_listings.set(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("verdant_calls_total"));
        assert!(text.contains("verdant_active_listings 3"));
    }
}
