use axum::body::{to_bytes, Body};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, instrument, warn, Span};

use crate::api::{DepotError, IngestResponse, ListResponse, RawPayload};
use crate::classify::OCTET_STREAM;
use crate::disposition::filename_from_header;
use crate::prometheus::report_request_error;
use crate::router;
use crate::service::Retrieval;

#[derive(Debug, Default, Deserialize)]
pub struct RetrievalQuery {
    pub request_id: Option<String>,
    pub raw: Option<String>,
}

impl RetrievalQuery {
    fn wants_raw(&self) -> bool {
        self.raw
            .as_deref()
            .is_some_and(|raw| raw.eq_ignore_ascii_case("true"))
    }
}

#[instrument(skip_all, fields(content_type, filename, size))]
pub async fn ingest(
    State(state): State<router::State>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<IngestResponse>, DepotError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(OCTET_STREAM)
        .to_string();
    let filename = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_header);

    Span::current().record("content_type", content_type.as_str());
    if let Some(filename) = &filename {
        Span::current().record("filename", filename.as_str());
    }

    let body = to_bytes(body, state.max_body_bytes).await.map_err(|e| {
        report_request_error("request_body", "ingest");
        warn!("ingest: failed to read request body: {}", e);
        DepotError::RequestBody(e.to_string())
    })?;
    Span::current().record("size", body.len());

    match state.service.ingest(body, &content_type, filename).await {
        Ok(accepted) => {
            // persistence keeps running after the handle is gone
            drop(accepted.persistence);
            Ok(Json(accepted.response))
        }
        Err(err) => {
            report_request_error(err.to_metric_tag(), "ingest");
            warn!("ingest: rejected payload: {}", err);
            Err(err)
        }
    }
}

#[instrument(skip_all, fields(request_id, raw))]
pub async fn retrieve(
    State(state): State<router::State>,
    Query(query): Query<RetrievalQuery>,
) -> Result<Response, DepotError> {
    let request_id = query
        .request_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(DepotError::MissingRequestId)?;
    let raw = query.wants_raw();

    Span::current().record("request_id", request_id);
    Span::current().record("raw", raw);

    match state.service.retrieve(request_id, raw).await {
        Ok(Retrieval::Metadata(document)) => Ok(Json(document).into_response()),
        Ok(Retrieval::Raw(payload)) => Ok(raw_response(payload)),
        Err(err) => {
            report_request_error(err.to_metric_tag(), "retrieve");
            match &err {
                DepotError::NotFound(_) => warn!("retrieve: {}", err),
                _ => error!("retrieve: failed: {}", err),
            }
            Err(err)
        }
    }
}

#[instrument(skip_all)]
pub async fn list(State(state): State<router::State>) -> Result<Json<ListResponse>, DepotError> {
    state.service.list().await.map(Json).map_err(|err| {
        report_request_error(err.to_metric_tag(), "list");
        error!("list: failed: {}", err);
        err
    })
}

pub async fn liveness(State(state): State<router::State>) -> StatusCode {
    if state.service.check_health().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn raw_response(payload: RawPayload) -> Response {
    let filename: String = payload
        .filename
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let filename = filename.replace('\\', "\\\\").replace('"', "\\\"");
    let disposition = format!("attachment; filename=\"{filename}\"");

    (
        [
            (header::CONTENT_TYPE, payload.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload.data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::router::router;
    use crate::service::PayloadService;
    use crate::storage::MemoryStorage;

    use super::*;

    fn app(storage: MemoryStorage, max_body_bytes: usize) -> axum::Router {
        router(
            PayloadService::new(Arc::new(storage)),
            max_body_bytes,
            None,
        )
    }

    #[test]
    fn raw_flag_parsing() {
        let query = |raw: Option<&str>| RetrievalQuery {
            request_id: Some("x".to_string()),
            raw: raw.map(str::to_string),
        };

        assert!(query(Some("true")).wants_raw());
        assert!(query(Some("TRUE")).wants_raw());
        assert!(!query(Some("1")).wants_raw());
        assert!(!query(None).wants_raw());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = app(MemoryStorage::new(), 8);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/depot")
                    .body(Body::from("this body is longer than eight bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_request_id_is_a_bad_request() {
        let app = app(MemoryStorage::new(), 1024);

        for uri in ["/get", "/get?request_id=", "/get?raw=true"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn quotes_are_escaped_in_download_names() {
        let response = raw_response(RawPayload {
            filename: "say \"hi\".txt".to_string(),
            content_type: "text/plain".to_string(),
            data: bytes::Bytes::from_static(b"hi"),
        });

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"say \\\"hi\\\".txt\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hi");
    }

    #[test]
    fn control_characters_never_reach_the_header() {
        let response = raw_response(RawPayload {
            filename: "bad\u{1}name\r\n.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: bytes::Bytes::from_static(b"x"),
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"badname.txt\""
        );
    }

    #[tokio::test]
    async fn liveness_follows_storage_health() {
        let healthy = app(MemoryStorage::new(), 1024)
            .oneshot(Request::builder().uri("/_liveness").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(healthy.status(), StatusCode::OK);

        let unhealthy = app(MemoryStorage::new().with_unhealthy(), 1024)
            .oneshot(Request::builder().uri("/_liveness").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(unhealthy.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn listing_failure_is_a_server_error() {
        let response = app(MemoryStorage::new().with_failing_list(), 1024)
            .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
