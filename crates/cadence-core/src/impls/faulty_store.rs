//! Test double: an in-memory store that fails selected operations.
//!
//! Each fault matches on a path substring.
//! - `fail_create` / `fail_delete`: the operation returns `Unavailable`
//! - `vanish_on_read`: the node still lists, but `get_data` reports `NoNode`

use async_trait::async_trait;

use crate::ports::{CoordinationStore, Parents, StoreError};

use super::InMemoryCoordinationStore;

#[derive(Default)]
pub(crate) struct FaultyStore {
    inner: InMemoryCoordinationStore,
    fail_create: Vec<&'static str>,
    fail_delete: Vec<&'static str>,
    vanish_on_read: Vec<&'static str>,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_create(mut self, pattern: &'static str) -> Self {
        self.fail_create.push(pattern);
        self
    }

    pub(crate) fn fail_delete(mut self, pattern: &'static str) -> Self {
        self.fail_delete.push(pattern);
        self
    }

    pub(crate) fn vanish_on_read(mut self, pattern: &'static str) -> Self {
        self.vanish_on_read.push(pattern);
        self
    }

    /// The underlying store, without faults.
    pub(crate) fn inner(&self) -> &InMemoryCoordinationStore {
        &self.inner
    }
}

fn matches(patterns: &[&str], path: &str) -> bool {
    patterns.iter().any(|pattern| path.contains(pattern))
}

#[async_trait]
impl CoordinationStore for FaultyStore {
    async fn create(&self, path: &str, data: &[u8], parents: Parents) -> Result<(), StoreError> {
        if matches(&self.fail_create, path) {
            return Err(StoreError::Unavailable(format!("create {path} refused")));
        }
        self.inner.create(path, data, parents).await
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.inner.set_data(path, data).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        if matches(&self.fail_delete, path) {
            return Err(StoreError::Unavailable(format!("delete {path} refused")));
        }
        self.inner.delete(path).await
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if matches(&self.vanish_on_read, path) {
            return Err(StoreError::NoNode(path.to_string()));
        }
        self.inner.get_data(path).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.inner.get_children(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        self.inner.exists(path).await
    }
}
