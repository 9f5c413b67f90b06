//! Prometheus metrics for observability.
//!
//! HTTP request metrics live here; lifecycle counters come from
//! `custodian_core::metrics` and are registered alongside. Gauges for the
//! current asset and ticket populations are refreshed on every scrape.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

use custodian_core::{AssetFilter, AssetStatus, TicketFilter, TicketStatus};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "custodian_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("custodian_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "custodian_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Requests refused because the acting identity headers were missing.
pub static ACTOR_REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_actor_rejections_total",
            "Requests without a usable acting identity",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Population Metrics (collected dynamically)
// =============================================================================

pub static ASSETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("custodian_assets_by_status", "Current asset count by status"),
        &["status"],
    )
    .unwrap()
});

pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("custodian_tickets_by_status", "Current ticket count by status"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(ACTOR_REJECTIONS_TOTAL.clone()))
        .unwrap();

    // Populations
    registry
        .register(Box::new(ASSETS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();

    // Lifecycle counters
    for metric in custodian_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the population gauges from the stores.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let lifecycle = state.lifecycle();

    for status in AssetStatus::ALL {
        let filter = AssetFilter::new().with_status(status);
        if let Ok(count) = lifecycle.registry().count(&filter) {
            ASSETS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count);
        }
    }

    for status in TicketStatus::ALL {
        let filter = TicketFilter::new().with_status(status);
        if let Ok(count) = lifecycle.tickets().count(&filter) {
            TICKETS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count);
        }
    }
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static BARCODE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/barcode/[^/]+").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = BARCODE_SEGMENT.replace_all(&result, "/barcode/{code}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/tickets/550e8400-e29b-41d4-a716-446655440000/comments";
        assert_eq!(normalize_path(path), "/api/v1/tickets/{id}/comments");
    }

    #[test]
    fn test_normalize_path_barcode() {
        let path = "/api/v1/assets/barcode/LT-0042";
        assert_eq!(normalize_path(path), "/api/v1/assets/barcode/{code}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/assets/12345/status";
        assert_eq!(normalize_path(path), "/api/v1/assets/{id}/status");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("custodian_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        custodian_core::metrics::ASSET_STATUS_TRANSITIONS
            .with_label_values(&["in_stock", "issued"])
            .inc();
        ASSETS_BY_STATUS.with_label_values(&["in_stock"]).set(0);

        let output = encode_metrics();
        assert!(output.contains("custodian_assets_by_status"));
        assert!(output.contains("custodian_asset_status_transitions_total"));
    }
}
