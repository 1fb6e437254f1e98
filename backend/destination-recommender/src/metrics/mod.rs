//! Prometheus metrics for the destination recommender.
//!
//! Exposes recommendation collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests by method, route and status",
        &["method", "path", "status"]
    )
    .expect("Failed to register http requests metric")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency by method and route",
        &["method", "path"],
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register http request duration metric")
});

static RECOMMENDATION_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_requests_total",
        "Hybrid recommendation requests by entry path and outcome",
        &["path", "outcome"]
    )
    .expect("Failed to register recommendation requests metric")
});

static RECOMMENDATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "recommendation_duration_seconds",
        "End-to-end fusion engine latency",
        &["path"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register recommendation duration metric")
});

static QUERY_EXPANSION_FALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "query_expansion_fallbacks_total",
        "Requests that used the raw query because expansion failed or was empty",
        &["reason"]
    )
    .expect("Failed to register query expansion fallback metric")
});

static CF_COLD_START_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cf_cold_start_total",
        "CF requests answered with the global mean because the user has no ratings"
    )
    .expect("Failed to register cold start metric")
});

static NON_FINITE_SCORES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "non_finite_scores_total",
        "NaN or infinite scores replaced with the neutral value",
        &["stage"]
    )
    .expect("Failed to register non-finite scores metric")
});

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(elapsed.as_secs_f64());
}

/// Record a finished recommendation request (path: profile/query, outcome: ok/empty/error)
pub fn record_recommendation(path: &str, outcome: &str, elapsed: Duration) {
    RECOMMENDATION_REQUESTS_TOTAL
        .with_label_values(&[path, outcome])
        .inc();
    RECOMMENDATION_DURATION_SECONDS
        .with_label_values(&[path])
        .observe(elapsed.as_secs_f64());
}

pub fn record_expansion_fallback(reason: &str) {
    QUERY_EXPANSION_FALLBACKS_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn record_cold_start() {
    CF_COLD_START_TOTAL.inc();
}

pub fn record_non_finite(stage: &str, count: usize) {
    if count > 0 {
        NON_FINITE_SCORES_TOTAL
            .with_label_values(&[stage])
            .inc_by(count as u64);
    }
}
