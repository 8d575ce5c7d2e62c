use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// `documents/<office>/<case>/<document>.pdf`
pub fn payload_key(office_id: Uuid, case_id: Uuid, document_id: Uuid) -> String {
    format!("documents/{office_id}/{case_id}/{document_id}.pdf")
}

/// Where rendered document payloads live.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Bytes, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct S3PayloadStore {
    client: S3Client,
    bucket: String,
}

impl S3PayloadStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl PayloadStore for S3PayloadStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), AppError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(PDF_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;
        info!("Uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("download of {key} failed: {e}")))?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("reading {key} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MemoryPayloadStore {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl PayloadStore for MemoryPayloadStore {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), AppError> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Bytes, AppError> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .map(|bytes| Bytes::from(bytes.clone()))
                .ok_or_else(|| AppError::NotFound(format!("payload {key} not found")))
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_memory_store_round_trip_and_delete() {
        let store = MemoryPayloadStore::default();
        store.put("a.pdf", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("a.pdf").await.unwrap(), Bytes::from_static(&[1, 2, 3]));
        store.delete("a.pdf").await.unwrap();
        assert!(matches!(store.get("a.pdf").await, Err(AppError::NotFound(_))));
    }
}
