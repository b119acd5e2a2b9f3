use std::time::Instant;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::SdkError,
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::{error, info};

use super::{StorageError, StorageGateway};

// Metric names
const S3_UPLOAD_BODY_SIZE_BYTES: &str = "depot_s3_upload_body_size_bytes";
const S3_UPLOAD_DURATION_SECONDS: &str = "depot_s3_upload_duration_seconds";
const S3_UPLOAD_TOTAL: &str = "depot_s3_upload_total";
const S3_DOWNLOAD_TOTAL: &str = "depot_s3_download_total";
const S3_LIST_TOTAL: &str = "depot_s3_list_total";

// Buckets in this region must be created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Extract error reason from SdkError for metrics labeling
fn extract_error_reason<E: std::fmt::Debug>(err: &SdkError<E>) -> String {
    match err {
        SdkError::ConstructionFailure(_) => "construction_failure".to_string(),
        SdkError::TimeoutError(_) => "timeout".to_string(),
        SdkError::DispatchFailure(_) => "connection_error".to_string(),
        SdkError::ResponseError(err) => {
            format!("response_error_{}", err.raw().status().as_u16())
        }
        SdkError::ServiceError(err) => {
            format!("status_{}", err.raw().status().as_u16())
        }
        _ => "unknown".to_string(),
    }
}

/// Configuration for creating the S3 gateway.
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Storage {
    /// Uses the default AWS credential chain unless explicit credentials are configured.
    pub async fn new(config: S3Config) -> Self {
        let region = Region::new(config.region.clone());

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config)
            .region(region)
            .force_path_style(true); // MinIO and localstack only serve path-style requests

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "env");
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            bucket = config.bucket,
            endpoint = config.endpoint,
            "S3 storage initialized"
        );

        Self {
            client,
            bucket: config.bucket,
            region: config.region,
        }
    }

    /// Create the bucket unless it is already reachable.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if self.check_health().await {
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = self.bucket, "created S3 bucket");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => {
                error!(bucket = self.bucket, error = %e, "failed to create S3 bucket");
                Err(StorageError::OperationFailed(format!(
                    "failed to create bucket {}: {e}",
                    self.bucket
                )))
            }
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn save(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let body_size = data.len();
        histogram!(S3_UPLOAD_BODY_SIZE_BYTES).record(body_size as f64);

        let start = Instant::now();
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await;

        histogram!(S3_UPLOAD_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match result {
            Ok(_) => {
                counter!(S3_UPLOAD_TOTAL, "outcome" => "success", "reason" => "ok").increment(1);
                Ok(())
            }
            Err(e) => {
                let reason = extract_error_reason(&e);
                counter!(S3_UPLOAD_TOTAL, "outcome" => "error", "reason" => reason.clone())
                    .increment(1);
                error!(
                    bucket = self.bucket,
                    key = name,
                    error = %e,
                    reason = reason,
                    "Failed to upload to S3"
                );
                Err(StorageError::OperationFailed(e.to_string()))
            }
        }
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| {
                let reason = extract_error_reason(&e);
                counter!(S3_DOWNLOAD_TOTAL, "outcome" => "error", "reason" => reason)
                    .increment(1);
                let message = format!("Failed to get object from S3: {e}");
                if let GetObjectError::NoSuchKey(_) = e.into_service_error() {
                    StorageError::NotFound(name.to_string())
                } else {
                    StorageError::OperationFailed(message)
                }
            })?;

        let body = output.body.collect().await.map_err(|e| {
            StorageError::OperationFailed(format!("Failed to read S3 object body: {e}"))
        })?;

        counter!(S3_DOWNLOAD_TOTAL, "outcome" => "success", "reason" => "ok").increment(1);
        Ok(body.into_bytes())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                let reason = extract_error_reason(&e);
                counter!(S3_LIST_TOTAL, "outcome" => "error", "reason" => reason).increment(1);
                error!(bucket = self.bucket, error = %e, "Failed to list S3 objects");
                StorageError::OperationFailed(format!("Failed to list objects: {e}"))
            })?;

            names.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }

        counter!(S3_LIST_TOTAL, "outcome" => "success", "reason" => "ok").increment(1);
        Ok(names)
    }

    /// Check S3 connectivity by verifying bucket access.
    async fn check_health(&self) -> bool {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => true,
            Err(e) => {
                error!(bucket = self.bucket, error = %e, "S3 health check failed");
                false
            }
        }
    }
}
