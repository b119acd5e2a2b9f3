use std::net::SocketAddr;

use envconfig::Envconfig;
use tracing::Level;

use crate::storage::S3Config;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3003")]
    pub address: SocketAddr,

    // Local debugging only, nothing survives a restart
    #[envconfig(default = "false")]
    pub memory_storage: bool,

    #[envconfig(nested = true)]
    pub s3: StorageConfig,

    #[envconfig(default = "104857600")]
    pub max_body_bytes: usize,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    pub otel_url: Option<String>,

    #[envconfig(default = "1.0")]
    pub otel_sampling_rate: f64,

    #[envconfig(default = "depot")]
    pub otel_service_name: String,

    #[envconfig(default = "info")]
    pub log_level: Level,
}

#[derive(Envconfig, Clone)]
pub struct StorageConfig {
    #[envconfig(from = "S3_BUCKET", default = "depot-payloads")]
    pub bucket: String,
    #[envconfig(from = "S3_REGION", default = "us-east-1")]
    pub region: String,
    #[envconfig(from = "S3_ENDPOINT")]
    pub endpoint: Option<String>,
    #[envconfig(from = "S3_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,
    #[envconfig(from = "S3_SECRET_ACCESS_KEY")]
    pub secret_access_key: Option<String>,
    #[envconfig(from = "S3_CREATE_BUCKET", default = "true")]
    pub create_bucket: bool,
}

impl From<&StorageConfig> for S3Config {
    fn from(config: &StorageConfig) -> Self {
        S3Config {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
        }
    }
}
