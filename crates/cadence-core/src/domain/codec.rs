//! PayloadCodec - 値とストアの bytes の相互変換
//!
//! ストアに置く値（RequestDefinition, Task）は JSON で保存します。
//! 失敗は `CadenceError::Serialization` に `what` 付きで変換します。

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CadenceError, Result};

/// A value that is stored as a node payload.
pub trait StoredValue: Serialize + DeserializeOwned {
    /// Used in error messages.
    const WHAT: &'static str;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| CadenceError::Serialization {
            what: Self::WHAT,
            source,
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| CadenceError::Serialization {
            what: Self::WHAT,
            source,
        })
    }
}

impl StoredValue for super::request::RequestDefinition {
    const WHAT: &'static str = "request definition";
}

impl StoredValue for super::task::Task {
    const WHAT: &'static str = "task";
}
