//! CoordinationStore port - 全レプリカが共有する階層型 KV ストア
//!
//! ZooKeeper のような強整合ストアを想定しています。
//! 各操作はアトミックで、完了後は全クライアントから即座に見えます。
//!
//! # 実装
//! - **InMemoryCoordinationStore**: テスト・デモ用（`impls::inmem_store`）
//! - **TimeoutStore**: 任意のストアに操作ごとのタイムアウトを付与

use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a single store operation.
///
/// `Unavailable` is kept apart from `NoNode`/`NodeExists` so callers can tell
/// "definitely absent" from "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("no node at {0}")]
    NoNode(String),

    #[error("parent of {0} does not exist")]
    NoParent(String),

    #[error("node {0} still has children")]
    NotEmpty(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Transport failure or timeout. The operation may or may not have been applied.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Whether `create` may build missing intermediate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parents {
    Create,
    Require,
}

/// The hierarchical store all scheduler replicas coordinate through.
///
/// Paths are absolute, `/`-separated and have no trailing slash.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Atomic create; fails with `NodeExists` if the node is already there.
    async fn create(&self, path: &str, data: &[u8], parents: Parents) -> Result<(), StoreError>;

    /// Overwrite the data of an existing node.
    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Names (not paths) of the direct children.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError>;
}

/// Join a root path and a single child segment.
pub fn child_path(root: &str, child: &str) -> String {
    if root == "/" {
        format!("/{child}")
    } else {
        format!("{root}/{child}")
    }
}
