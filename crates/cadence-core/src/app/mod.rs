//! App - アプリケーション層
//!
//! ports を組み合わせてライフサイクル管理を実装します。
//!
//! # 主要コンポーネント
//! - **RequestManager**: リクエスト定義、pending run キュー、cleanup キュー
//! - **TaskManager**: pending マーカーと active タスク（launch / teardown）
//! - **StateGenerator**: ホスト・クラスタ状態のスナップショット

mod store_ops;

pub mod listing;
pub mod request_manager;
pub mod status;
pub mod task_manager;

// 主要な型を再エクスポート
pub use self::listing::{Listing, MarkerOutcome, PersistOutcome, RemovalOutcome};
pub use self::request_manager::RequestManager;
pub use self::status::{HostState, StateGenerator};
pub use self::task_manager::{ScheduleReport, TaskManager};
