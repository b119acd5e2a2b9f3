use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use multer::{parse_boundary, Multipart};
use tracing::{debug, warn};

use crate::api::DepotError;
use crate::classify::{ContentTypeClassifier, MULTIPART_FORM_DATA};
use crate::disposition::filename_from_header;
use crate::naming::{basename, ObjectNamer};
use crate::payload::StorableUnit;

#[async_trait]
pub trait PayloadDecomposer: Send + Sync {
    /// Split one request body into the units to store under `event_id`.
    ///
    /// Only a body that claims to be multipart can fail, and then nothing is returned.
    async fn decompose(
        &self,
        event_id: &str,
        body: Bytes,
        declared_content_type: &str,
        filename: Option<&str>,
    ) -> Result<Vec<StorableUnit>, DepotError>;
}

pub struct MultipartDecomposer {
    classifier: Arc<dyn ContentTypeClassifier + Send + Sync>,
    namer: Arc<dyn ObjectNamer + Send + Sync>,
}

impl MultipartDecomposer {
    pub fn new(
        classifier: Arc<dyn ContentTypeClassifier + Send + Sync>,
        namer: Arc<dyn ObjectNamer + Send + Sync>,
    ) -> Self {
        Self { classifier, namer }
    }

    async fn split_multipart(
        &self,
        event_id: &str,
        body: Bytes,
        declared_content_type: &str,
    ) -> Result<Vec<StorableUnit>, DepotError> {
        let boundary = parse_boundary(declared_content_type).map_err(|e| {
            warn!("Failed to parse boundary from Content-Type: {}", e);
            DepotError::MalformedInput(format!("Invalid boundary in Content-Type: {e}"))
        })?;

        let body_stream = stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
        let mut multipart = Multipart::new(body_stream, boundary);

        let mut units = Vec::new();
        let mut skipped_fields = 0;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!("Multipart parsing error: {}", e);
            DepotError::MalformedInput(format!("Multipart parsing failed: {e}"))
        })? {
            let filename = field
                .headers()
                .get("content-disposition")
                .and_then(|value| value.to_str().ok())
                .and_then(filename_from_header);

            let Some(filename) = filename else {
                debug!(field = field.name(), "skipping multipart field without filename");
                skipped_fields += 1;
                continue;
            };

            let data = field.bytes().await.map_err(|e| {
                warn!("Failed to read multipart part '{}': {}", filename, e);
                DepotError::MalformedInput(format!("Failed to read multipart part: {e}"))
            })?;

            units.push(StorableUnit {
                name: self.namer.name(event_id, Some(&filename), MULTIPART_FORM_DATA),
                content_type: self.classifier.from_filename(&filename),
                data,
                source_filename: Some(filename),
            });
        }

        debug!(
            request_id = event_id,
            units = units.len(),
            skipped_fields,
            "multipart body decomposed"
        );
        Ok(units)
    }
}

#[async_trait]
impl PayloadDecomposer for MultipartDecomposer {
    async fn decompose(
        &self,
        event_id: &str,
        body: Bytes,
        declared_content_type: &str,
        filename: Option<&str>,
    ) -> Result<Vec<StorableUnit>, DepotError> {
        let normalized = self.classifier.from_header(declared_content_type);
        if normalized == MULTIPART_FORM_DATA {
            return self
                .split_multipart(event_id, body, declared_content_type)
                .await;
        }

        let filename = filename
            .map(basename)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let content_type = self
            .classifier
            .resolve(declared_content_type, filename.as_deref());

        Ok(vec![StorableUnit {
            name: self.namer.name(event_id, filename.as_deref(), &normalized),
            data: body,
            content_type,
            source_filename: filename,
        }])
    }
}
