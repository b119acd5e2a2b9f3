use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use tracing::{debug, warn};

use crate::api::DepotError;
use crate::naming::{original_filename, stored_content_type};
use crate::payload::RetrievedFile;
use crate::prometheus::report_retrieval_fetch_error;
use crate::storage::StorageGateway;

#[async_trait]
pub trait RetrievalAggregator: Send + Sync {
    /// Every stored unit of one event, in listing order. Fails with `NotFound` when nothing
    /// could be read back.
    async fn aggregate(&self, event_id: &str) -> Result<Vec<RetrievedFile>, DepotError>;
}

pub struct StorageAggregator {
    storage: Arc<dyn StorageGateway>,
}

impl StorageAggregator {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RetrievalAggregator for StorageAggregator {
    async fn aggregate(&self, event_id: &str) -> Result<Vec<RetrievedFile>, DepotError> {
        let prefix = format!("{event_id}_");
        let matching: Vec<String> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect();

        debug!(request_id = event_id, matches = matching.len(), "listed stored units");

        let fetches = matching.iter().map(|name| self.storage.get(name));
        let results = join_all(fetches).await;

        let mut files = Vec::with_capacity(results.len());
        for (name, result) in matching.iter().zip(results) {
            match result {
                Ok(data) => files.push(RetrievedFile {
                    object_name: name.clone(),
                    original_filename: original_filename(event_id, name),
                    size: data.len(),
                    content_type: stored_content_type(name).to_string(),
                    data,
                }),
                Err(err) => {
                    warn!(
                        request_id = event_id,
                        object_name = name,
                        error = %err,
                        "skipping unit that could not be fetched"
                    );
                    report_retrieval_fetch_error();
                }
            }
        }

        if files.is_empty() {
            counter!("depot_retrievals_not_found_total").increment(1);
            return Err(DepotError::NotFound(event_id.to_string()));
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    const ID: &str = "1700000000-0102030405060708";

    async fn seeded(storage: MemoryStorage) -> Arc<MemoryStorage> {
        let objects = [
            (format!("{ID}_payload.json"), "{\"a\":1}"),
            (format!("{ID}_a.txt"), "hi"),
            ("1700000000-ffffffffffffffff_a.txt".to_string(), "other event"),
        ];
        for (name, data) in objects {
            storage
                .save(&name, Bytes::from(data), "text/plain")
                .await
                .unwrap();
        }
        Arc::new(storage)
    }

    #[tokio::test]
    async fn collects_units_of_one_event() {
        let storage = seeded(MemoryStorage::new()).await;
        let aggregator = StorageAggregator::new(storage);

        let mut files = aggregator.aggregate(ID).await.unwrap();
        files.sort_by(|a, b| a.object_name.cmp(&b.object_name));

        assert_eq!(files.len(), 2);

        assert_eq!(files[0].object_name, format!("{ID}_a.txt"));
        assert_eq!(files[0].original_filename.as_deref(), Some("a.txt"));
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(files[0].size, 2);

        assert_eq!(files[1].object_name, format!("{ID}_payload.json"));
        assert_eq!(files[1].original_filename, None);
        assert_eq!(files[1].content_type, "application/json");
        assert_eq!(files[1].data, Bytes::from_static(b"{\"a\":1}"));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let aggregator = StorageAggregator::new(seeded(MemoryStorage::new()).await);

        assert!(matches!(
            aggregator.aggregate("1700000000-0000000000000000").await,
            Err(DepotError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn id_prefix_does_not_match_longer_ids() {
        let aggregator = StorageAggregator::new(seeded(MemoryStorage::new()).await);

        // "1700000000-01020304" is a prefix of ID but not followed by '_'
        assert!(matches!(
            aggregator.aggregate("1700000000-01020304").await,
            Err(DepotError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped() {
        let storage =
            seeded(MemoryStorage::new().with_failing_get(&format!("{ID}_a.txt"))).await;
        let aggregator = StorageAggregator::new(storage);

        let files = aggregator.aggregate(ID).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].object_name, format!("{ID}_payload.json"));
    }

    #[tokio::test]
    async fn all_fetches_failing_is_not_found() {
        let storage = seeded(
            MemoryStorage::new()
                .with_failing_get(&format!("{ID}_a.txt"))
                .with_failing_get(&format!("{ID}_payload.json")),
        )
        .await;
        let aggregator = StorageAggregator::new(storage);

        assert!(matches!(
            aggregator.aggregate(ID).await,
            Err(DepotError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_failure_is_surfaced() {
        let storage = seeded(MemoryStorage::new().with_failing_list()).await;
        let aggregator = StorageAggregator::new(storage);

        assert!(matches!(
            aggregator.aggregate(ID).await,
            Err(DepotError::Storage(StorageError::OperationFailed(_)))
        ));
    }
}
