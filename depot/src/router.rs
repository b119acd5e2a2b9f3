use std::future::ready;

use axum::http::Method;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::endpoints;
use crate::metrics_middleware::track_metrics;
use crate::service::PayloadService;

#[derive(Clone)]
pub struct State {
    pub service: PayloadService,
    pub max_body_bytes: usize,
}

async fn index() -> &'static str {
    "depot"
}

/// Build the HTTP surface. `/metrics` is only mounted when a recorder handle is given.
pub fn router(
    service: PayloadService,
    max_body_bytes: usize,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let state = State {
        service,
        max_body_bytes,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(AllowOrigin::mirror_request());

    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(endpoints::liveness))
        .route("/depot", post(endpoints::ingest).put(endpoints::ingest))
        .route("/get", get(endpoints::retrieve))
        .route("/list", get(endpoints::list))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // The recorder is global, so tests build routers without one
    match metrics {
        Some(handle) => router.route("/metrics", get(move || ready(handle.render()))),
        None => router,
    }
}
