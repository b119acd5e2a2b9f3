//! Key to blob storage behind the depot.
//!
//! The service only depends on [`StorageGateway`]; the S3 implementation is used in
//! production and the in-memory one for local debugging and tests.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod memory;
pub mod s3;

pub use memory::MemoryStorage;
pub use s3::{S3Config, S3Storage};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn save(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// `StorageError::NotFound` when nothing is stored under `name`.
    async fn get(&self, name: &str) -> Result<Bytes, StorageError>;

    /// Every stored name, in no particular order.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    async fn check_health(&self) -> bool;
}
