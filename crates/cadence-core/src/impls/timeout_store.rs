//! TimeoutStore - 操作ごとのタイムアウト
//!
//! タイムアウトは「不在」ではなく `Unavailable`（リトライ可能）として返します。
//! タイムアウトした create は実際には成功している可能性があります。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::ports::{CoordinationStore, Parents, StoreError};

/// Wraps a store and bounds every operation by `timeout`.
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: CoordinationStore> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        path: &str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, path, timeout = ?self.timeout, "store operation timed out");
                Err(StoreError::Unavailable(format!(
                    "{operation} {path} timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl<S: CoordinationStore> CoordinationStore for TimeoutStore<S> {
    async fn create(&self, path: &str, data: &[u8], parents: Parents) -> Result<(), StoreError> {
        self.bounded("create", path, self.inner.create(path, data, parents))
            .await
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.bounded("set_data", path, self.inner.set_data(path, data))
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.bounded("delete", path, self.inner.delete(path)).await
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.bounded("get_data", path, self.inner.get_data(path)).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.bounded("get_children", path, self.inner.get_children(path))
            .await
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        self.bounded("exists", path, self.inner.exists(path)).await
    }
}
