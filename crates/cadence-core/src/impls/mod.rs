//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryCoordinationStore**: 開発・テスト用の協調ストア
//! - **TimeoutStore**: 任意のストアにタイムアウトを付与するラッパー
//!
//! 本番用のストアクライアント（ZooKeeper など）は別クレートに配置します。

#[cfg(test)]
pub(crate) mod faulty_store;
pub mod inmem_store;
pub mod timeout_store;

pub use self::inmem_store::InMemoryCoordinationStore;
pub use self::timeout_store::TimeoutStore;
