use base64::Engine;
use bytes::Bytes;

use crate::api::{
    FileEntry, IngestResponse, IngestStatus, ListResponse, RawPayload, RetrievalResponse,
};
use crate::payload::RetrievedFile;

pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Maps internal structures to the documents and raw payloads returned to callers.
pub trait ResponseFormatter {
    fn ingest_response(
        &self,
        event_id: &str,
        size: usize,
        timestamp: String,
        original_filename: Option<String>,
    ) -> IngestResponse;

    fn retrieval_response(&self, event_id: &str, files: &[RetrievedFile]) -> RetrievalResponse;

    fn list_response(&self, objects: Vec<String>) -> ListResponse;

    fn raw_file(&self, file: RetrievedFile) -> RawPayload;

    fn raw_archive(&self, event_id: &str, archive: Bytes) -> RawPayload;
}

#[derive(Clone, Default)]
pub struct DefaultFormatter {}

impl ResponseFormatter for DefaultFormatter {
    fn ingest_response(
        &self,
        event_id: &str,
        size: usize,
        timestamp: String,
        original_filename: Option<String>,
    ) -> IngestResponse {
        IngestResponse {
            status: IngestStatus::Accepted,
            request_id: event_id.to_string(),
            size,
            timestamp,
            original_filename,
        }
    }

    fn retrieval_response(&self, event_id: &str, files: &[RetrievedFile]) -> RetrievalResponse {
        let files: Vec<FileEntry> = files
            .iter()
            .map(|file| FileEntry {
                object_name: file.object_name.clone(),
                original_filename: file.original_filename.clone().unwrap_or_default(),
                size: file.size,
                content_type: file.content_type.clone(),
                payload_base64: base64::engine::general_purpose::STANDARD.encode(&file.data),
            })
            .collect();

        RetrievalResponse {
            request_id: event_id.to_string(),
            count: files.len(),
            files,
        }
    }

    fn list_response(&self, objects: Vec<String>) -> ListResponse {
        ListResponse {
            count: objects.len(),
            objects,
        }
    }

    fn raw_file(&self, file: RetrievedFile) -> RawPayload {
        RawPayload {
            filename: file.download_name().to_string(),
            content_type: file.content_type,
            data: file.data,
        }
    }

    fn raw_archive(&self, event_id: &str, archive: Bytes) -> RawPayload {
        RawPayload {
            filename: format!("payloads_{event_id}.zip"),
            content_type: ARCHIVE_CONTENT_TYPE.to_string(),
            data: archive,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;

    fn anonymous_json() -> RetrievedFile {
        RetrievedFile {
            object_name: "1700000000-aa_payload.json".to_string(),
            original_filename: None,
            size: 7,
            content_type: "application/json".to_string(),
            data: Bytes::from_static(b"{\"a\":1}"),
        }
    }

    #[test]
    fn retrieval_document_shape() {
        let document = DefaultFormatter::default()
            .retrieval_response("1700000000-aa", &[anonymous_json()]);

        assert_json_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "request_id": "1700000000-aa",
                "count": 1,
                "files": [{
                    "object_name": "1700000000-aa_payload.json",
                    "original_filename": "",
                    "size": 7,
                    "content_type": "application/json",
                    "payload_base64": "eyJhIjoxfQ==",
                }],
            })
        );
        assert_eq!(
            document.files[0].decode_payload().unwrap(),
            Bytes::from_static(b"{\"a\":1}")
        );
    }

    #[test]
    fn ingest_document_shape() {
        let document = DefaultFormatter::default().ingest_response(
            "1700000000-aa",
            2,
            "2024-01-01T00:00:00Z".to_string(),
            Some("a.txt".to_string()),
        );

        assert_json_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "status": "accepted",
                "request_id": "1700000000-aa",
                "size": 2,
                "timestamp": "2024-01-01T00:00:00Z",
                "original_filename": "a.txt",
            })
        );
    }

    #[test]
    fn raw_names() {
        let formatter = DefaultFormatter::default();

        let single = formatter.raw_file(anonymous_json());
        assert_eq!(single.filename, "1700000000-aa_payload.json");
        assert_eq!(single.content_type, "application/json");

        let archive = formatter.raw_archive("1700000000-aa", Bytes::from_static(b"PK"));
        assert_eq!(archive.filename, "payloads_1700000000-aa.zip");
        assert_eq!(archive.content_type, ARCHIVE_CONTENT_TYPE);
    }

    #[test]
    fn list_document_counts_objects() {
        let document =
            DefaultFormatter::default().list_response(vec!["a_1".to_string(), "b_2".to_string()]);

        assert_eq!(document.count, 2);
        assert_eq!(document.objects, vec!["a_1", "b_2"]);
    }
}
