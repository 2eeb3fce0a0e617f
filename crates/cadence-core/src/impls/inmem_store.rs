//! InMemoryCoordinationStore - 開発・テスト用の協調ストア
//!
//! ZooKeeper と同じ意味論を持つ最小実装です。
//! - create は既存ノードがあれば `NodeExists`
//! - delete は子ノードがあれば `NotEmpty`
//! - ルート `/` は常に存在する
//!
//! `set_available(false)` で全操作を `Unavailable` にできます（障害注入）。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{CoordinationStore, Parents, StoreError};

const ROOT: &str = "/";

/// In-memory hierarchical store.
///
/// # 実装詳細
/// - `BTreeMap<path, data>` で全ノードを管理（ルートは暗黙）
/// - 子ノードの列挙は prefix の range scan
pub struct InMemoryCoordinationStore {
    nodes: Mutex<BTreeMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every operation fails with
    /// `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of nodes, excluding the root.
    pub async fn len(&self) -> usize {
        self.nodes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.lock().await.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store marked unavailable".into()))
        }
    }
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_path(path: &str) -> Result<(), StoreError> {
    if path == ROOT {
        return Ok(());
    }
    let valid = path.starts_with('/')
        && !path.ends_with('/')
        && path[1..].split('/').all(|segment| !segment.is_empty());
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some(("", _)) if path != ROOT => Some(ROOT),
        Some((parent, _)) if !parent.is_empty() => Some(parent),
        _ => None,
    }
}

fn children_prefix(path: &str) -> String {
    if path == ROOT {
        ROOT.to_string()
    } else {
        format!("{path}/")
    }
}

fn node_exists(nodes: &BTreeMap<String, Vec<u8>>, path: &str) -> bool {
    path == ROOT || nodes.contains_key(path)
}

fn has_children(nodes: &BTreeMap<String, Vec<u8>>, path: &str) -> bool {
    let prefix = children_prefix(path);
    nodes
        .range(prefix.clone()..)
        .next()
        .is_some_and(|(key, _)| key.starts_with(&prefix))
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn create(&self, path: &str, data: &[u8], parents: Parents) -> Result<(), StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let mut nodes = self.nodes.lock().await;
        if node_exists(&nodes, path) {
            return Err(StoreError::NodeExists(path.to_string()));
        }

        let mut missing = Vec::new();
        let mut cursor = parent_of(path);
        while let Some(ancestor) = cursor {
            if node_exists(&nodes, ancestor) {
                break;
            }
            missing.push(ancestor.to_string());
            cursor = parent_of(ancestor);
        }
        if !missing.is_empty() && parents == Parents::Require {
            return Err(StoreError::NoParent(path.to_string()));
        }
        for ancestor in missing {
            nodes.insert(ancestor, Vec::new());
        }

        nodes.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let mut nodes = self.nodes.lock().await;
        match nodes.get_mut(path) {
            Some(existing) => {
                *existing = data.to_vec();
                Ok(())
            }
            None => Err(StoreError::NoNode(path.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let mut nodes = self.nodes.lock().await;
        if !nodes.contains_key(path) {
            return Err(StoreError::NoNode(path.to_string()));
        }
        if has_children(&nodes, path) {
            return Err(StoreError::NotEmpty(path.to_string()));
        }
        nodes.remove(path);
        Ok(())
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let nodes = self.nodes.lock().await;
        nodes
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NoNode(path.to_string()))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let nodes = self.nodes.lock().await;
        if !node_exists(&nodes, path) {
            return Err(StoreError::NoNode(path.to_string()));
        }
        let prefix = children_prefix(path);
        let children = nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| &key[prefix.len()..])
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        Ok(children)
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        validate_path(path)?;
        let nodes = self.nodes.lock().await;
        Ok(node_exists(&nodes, path))
    }
}
