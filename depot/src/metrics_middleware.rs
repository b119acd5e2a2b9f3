use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::IntoResponse,
};
use metrics::gauge;

static ACTIVE_REQUESTS: AtomicUsize = AtomicUsize::new(0);

// Decrements the gauge even when the handler panics
struct InFlightGuard;

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let in_flight = ACTIVE_REQUESTS
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        gauge!(METRIC_DEPOT_ACTIVE_REQUESTS).set(in_flight as f64);
    }
}

const METRIC_DEPOT_ACTIVE_REQUESTS: &str = "depot_active_requests";
const METRIC_HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
const METRIC_HTTP_REQUESTS_DURATION_SECONDS: &str = "http_requests_duration_seconds";

/// Middleware to record some common HTTP metrics
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let method = req.method().clone();

    let in_flight = ACTIVE_REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;
    gauge!(METRIC_DEPOT_ACTIVE_REQUESTS).set(in_flight as f64);
    let _guard = InFlightGuard;

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!(METRIC_HTTP_REQUESTS_TOTAL, &labels).increment(1);
    metrics::histogram!(METRIC_HTTP_REQUESTS_DURATION_SECONDS, &labels).record(latency);

    response
}
