use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum DepotError {
    #[error("missing request_id query parameter")]
    MissingRequestId,
    #[error("malformed request body: {0}")]
    MalformedInput(String),
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("no payloads found for request_id {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to decode payload: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("failed to build archive: {0}")]
    Archive(String),
}

impl DepotError {
    pub fn to_metric_tag(&self) -> &'static str {
        match self {
            DepotError::MissingRequestId => "missing_request_id",
            DepotError::MalformedInput(_) => "malformed_input",
            DepotError::RequestBody(_) => "request_body",
            DepotError::NotFound(_) => "not_found",
            DepotError::Storage(_) => "storage",
            DepotError::Encoding(_) => "encoding",
            DepotError::Archive(_) => "archive",
        }
    }
}

impl IntoResponse for DepotError {
    fn into_response(self) -> Response {
        match self {
            DepotError::MissingRequestId
            | DepotError::MalformedInput(_)
            | DepotError::RequestBody(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            DepotError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            DepotError::Storage(_) | DepotError::Encoding(_) | DepotError::Archive(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
        .into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Accepted,
}

/// Returned as soon as a body has been decomposed, before its units are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestResponse {
    pub status: IngestStatus,
    pub request_id: String,
    pub size: usize,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileEntry {
    pub object_name: String,
    /// Empty for anonymous payloads.
    pub original_filename: String,
    pub size: usize,
    pub content_type: String,
    pub payload_base64: String,
}

impl FileEntry {
    pub fn decode_payload(&self) -> Result<Bytes, DepotError> {
        let decoded = base64::engine::general_purpose::STANDARD.decode(&self.payload_base64)?;
        Ok(Bytes::from(decoded))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrievalResponse {
    pub request_id: String,
    pub count: usize,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub objects: Vec<String>,
}

/// Bytes the transport streams back verbatim, with the headers it needs to do so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}
