use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::prometheus::setup_metrics_recorder;
use crate::router;
use crate::service::PayloadService;
use crate::storage::{MemoryStorage, S3Config, S3Storage, StorageGateway};

async fn create_storage(config: &Config) -> anyhow::Result<Arc<dyn StorageGateway>> {
    if config.memory_storage {
        warn!("using in-memory storage, payloads will not survive a restart");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    let storage = S3Storage::new(S3Config::from(&config.s3)).await;
    if config.s3.create_bucket {
        storage
            .ensure_bucket()
            .await
            .with_context(|| format!("failed to prepare bucket {}", storage.bucket()))?;
    }

    Ok(Arc::new(storage))
}

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let storage = create_storage(&config).await?;
    let service = PayloadService::new(storage);

    let metrics = if config.export_prometheus {
        Some(setup_metrics_recorder().context("failed to install prometheus recorder")?)
    } else {
        None
    };

    let app = router::router(service, config.max_body_bytes, metrics);

    info!("listening on {:?}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    Ok(())
}
