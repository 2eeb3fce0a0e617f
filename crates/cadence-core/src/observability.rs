use serde::{Deserialize, Serialize};

/// Aggregate sizes of the coordination subtrees, used by the scheduling loop
/// for backpressure and by the host state snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDepths {
    pub active_requests: usize,
    pub pending_requests: usize,
    pub cleanup_requests: usize,
    pub active_tasks: usize,
    pub scheduled_tasks: usize,
}
