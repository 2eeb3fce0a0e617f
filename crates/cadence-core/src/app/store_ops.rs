//! Store access discipline shared by the lifecycle managers:
//! - create-only for anything that must not silently duplicate
//! - deletes always tolerate a missing node
//! - a missing root lists as empty

use std::sync::Arc;

use tracing::debug;

use crate::domain::StoredValue;
use crate::error::Result;
use crate::ports::{CoordinationStore, Parents, StoreError};

use super::listing::{MarkerOutcome, RemovalOutcome};

#[derive(Clone)]
pub(crate) struct StoreOps {
    store: Arc<dyn CoordinationStore>,
}

impl StoreOps {
    pub(crate) fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &dyn CoordinationStore {
        self.store.as_ref()
    }

    /// Create an empty marker node; an existing node counts as success.
    pub(crate) async fn create_marker(&self, path: &str) -> Result<MarkerOutcome> {
        match self.store.create(path, &[], Parents::Create).await {
            Ok(()) => Ok(MarkerOutcome::Created),
            Err(StoreError::NodeExists(_)) => {
                debug!(path, "marker already present");
                Ok(MarkerOutcome::AlreadyPresent)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn remove(&self, path: &str) -> Result<RemovalOutcome> {
        match self.store.delete(path).await {
            Ok(()) => Ok(RemovalOutcome::Removed),
            Err(StoreError::NoNode(_)) => {
                debug!(path, "node already gone");
                Ok(RemovalOutcome::AlreadyAbsent)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn children(&self, root: &str) -> Result<Vec<String>> {
        match self.store.get_children(root).await {
            Ok(children) => Ok(children),
            Err(StoreError::NoNode(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn num_children(&self, root: &str) -> Result<usize> {
        Ok(self.children(root).await?.len())
    }

    pub(crate) async fn read<T: StoredValue>(&self, path: &str) -> Result<Option<T>> {
        match self.store.get_data(path).await {
            Ok(bytes) => T::from_bytes(&bytes).map(Some),
            Err(StoreError::NoNode(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
