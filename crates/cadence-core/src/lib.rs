//! cadence-core
//!
//! Lifecycle and state-coordination core of a distributed task scheduler.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, task, validation, codec）
//! - **ports**: 抽象化レイヤー（CoordinationStore, Clock, ClusterView, HostInfo）
//! - **app**: ライフサイクル管理（RequestManager, TaskManager, StateGenerator）
//! - **impls**: 実装（InMemoryCoordinationStore, TimeoutStore）
//! - **config**: 設定の読み込み
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::app::{
    HostState, Listing, MarkerOutcome, PersistOutcome, RemovalOutcome, RequestManager,
    ScheduleReport, StateGenerator, TaskManager,
};
pub use crate::config::CadenceConfig;
pub use crate::error::{CadenceError, ErrorKind, Result, ValidationError};
