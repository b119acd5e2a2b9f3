use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::aggregate::{RetrievalAggregator, StorageAggregator};
use crate::api::{DepotError, IngestResponse, ListResponse, RawPayload, RetrievalResponse};
use crate::bundle::{ArchiveBundler, ZipBundler};
use crate::classify::DefaultClassifier;
use crate::decompose::{MultipartDecomposer, PayloadDecomposer};
use crate::format::{DefaultFormatter, ResponseFormatter};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::naming::DefaultNamer;
use crate::payload::StorableUnit;
use crate::prometheus::{report_ingested_bytes, report_unit_save_failed, report_unit_saved};
use crate::storage::StorageGateway;
use crate::time::{SystemTime, TimeSource};

/// Result of one background persistence run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub saved: usize,
    pub failed: usize,
}

/// An accepted ingestion: the document for the caller, plus the detached task storing the units.
pub struct Accepted {
    pub response: IngestResponse,
    pub persistence: JoinHandle<PersistOutcome>,
}

#[derive(Debug)]
pub enum Retrieval {
    Metadata(RetrievalResponse),
    Raw(RawPayload),
}

/// Wires the pipeline together. Every collaborator can be swapped through the `with_*` methods.
#[derive(Clone)]
pub struct PayloadService {
    ids: Arc<dyn IdGenerator + Send + Sync>,
    timesource: Arc<dyn TimeSource + Send + Sync>,
    decomposer: Arc<dyn PayloadDecomposer>,
    storage: Arc<dyn StorageGateway>,
    aggregator: Arc<dyn RetrievalAggregator>,
    bundler: Arc<dyn ArchiveBundler + Send + Sync>,
    formatter: Arc<dyn ResponseFormatter + Send + Sync>,
}

impl PayloadService {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        let decomposer = MultipartDecomposer::new(
            Arc::new(DefaultClassifier::default()),
            Arc::new(DefaultNamer::default()),
        );

        Self {
            ids: Arc::new(RandomIdGenerator::default()),
            timesource: Arc::new(SystemTime::default()),
            decomposer: Arc::new(decomposer),
            aggregator: Arc::new(StorageAggregator::new(storage.clone())),
            storage,
            bundler: Arc::new(ZipBundler::default()),
            formatter: Arc::new(DefaultFormatter::default()),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator + Send + Sync>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_time_source(mut self, timesource: Arc<dyn TimeSource + Send + Sync>) -> Self {
        self.timesource = timesource;
        self
    }

    pub fn with_decomposer(mut self, decomposer: Arc<dyn PayloadDecomposer>) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn RetrievalAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn ArchiveBundler + Send + Sync>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ResponseFormatter + Send + Sync>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Decompose `body` under a fresh event id and hand its units to a detached task.
    ///
    /// Returns once the body is decomposed; the units may not be stored yet.
    pub async fn ingest(
        &self,
        body: Bytes,
        content_type: &str,
        filename: Option<String>,
    ) -> Result<Accepted, DepotError> {
        let event_id = self.ids.generate();
        let size = body.len();

        let units = self
            .decomposer
            .decompose(&event_id, body, content_type, filename.as_deref())
            .await?;
        report_ingested_bytes(size);

        info!(
            request_id = event_id,
            size,
            units = units.len(),
            "payload accepted"
        );

        let persistence = self.dispatch_persistence(event_id.clone(), units);
        let response = self.formatter.ingest_response(
            &event_id,
            size,
            self.timesource.current_timestamp(),
            filename,
        );

        Ok(Accepted {
            response,
            persistence,
        })
    }

    /// Spawn the task saving `units`. Nothing on the request path waits for it.
    pub fn dispatch_persistence(
        &self,
        event_id: String,
        units: Vec<StorableUnit>,
    ) -> JoinHandle<PersistOutcome> {
        let storage = self.storage.clone();
        let span = tracing::info_span!("persist", request_id = %event_id);
        tokio::spawn(persist_units(storage, units).instrument(span))
    }

    pub async fn retrieve(&self, event_id: &str, raw: bool) -> Result<Retrieval, DepotError> {
        let mut files = self.aggregator.aggregate(event_id).await?;

        if !raw {
            let document = self.formatter.retrieval_response(event_id, &files);
            return Ok(Retrieval::Metadata(document));
        }

        if files.len() == 1 {
            if let Some(file) = files.pop() {
                return Ok(Retrieval::Raw(self.formatter.raw_file(file)));
            }
        }

        let archive = self.bundler.bundle(&files)?;
        Ok(Retrieval::Raw(self.formatter.raw_archive(event_id, archive)))
    }

    pub async fn list(&self) -> Result<ListResponse, DepotError> {
        let objects = self.storage.list().await?;
        Ok(self.formatter.list_response(objects))
    }

    pub async fn check_health(&self) -> bool {
        self.storage.check_health().await
    }
}

async fn persist_units(storage: Arc<dyn StorageGateway>, units: Vec<StorableUnit>) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();

    for unit in units {
        let size = unit.data.len();
        match storage.save(&unit.name, unit.data, &unit.content_type).await {
            Ok(()) => {
                info!(object_name = unit.name, size, "unit stored");
                report_unit_saved();
                outcome.saved += 1;
            }
            Err(err) => {
                error!(object_name = unit.name, error = %err, "failed to store unit");
                report_unit_save_failed();
                outcome.failed += 1;
            }
        }
    }

    outcome
}
