//! Ports - 抽象化レイヤー
//!
//! 外部システム（協調ストア、クラスタマネージャ、時計、ホスト情報）への
//! インターフェースを定義し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 協調ストアが source of truth（正本）
//! - レプリカ内のコピーはすべてキャッシュ扱い

pub mod clock;
pub mod cluster;
pub mod coordination_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::cluster::{ClusterView, DriverStatus, HostInfo, LocalHost};
pub use self::coordination_store::{CoordinationStore, Parents, StoreError, child_path};
