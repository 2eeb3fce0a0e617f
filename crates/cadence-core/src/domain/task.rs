use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{PendingTaskId, TaskId};
use super::request::RequestDefinition;

/// A pending task together with the request definition as it was at dispatch
/// time. Later edits to the request do not change what was launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    request: RequestDefinition,
    pending_task_id: PendingTaskId,
}

impl TaskRequest {
    pub fn new(request: RequestDefinition, pending_task_id: PendingTaskId) -> Self {
        Self {
            request,
            pending_task_id,
        }
    }

    pub fn request(&self) -> &RequestDefinition {
        &self.request
    }

    pub fn pending_task_id(&self) -> &PendingTaskId {
        &self.pending_task_id
    }
}

/// Where a task was placed by the offer-matching loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_id: Option<String>,
    #[serde(default)]
    pub ports: Vec<u32>,
    /// Cluster-manager task metadata (slave id, executor id, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A launched task, persisted under `/tasks/{taskId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    task_request: TaskRequest,
    task_id: TaskId,
    placement: Placement,
}

impl Task {
    /// The task id is derived from the request's pending id, so the pending
    /// marker and the active node always describe the same task.
    pub fn new(task_request: TaskRequest, started_at: u64, placement: Placement) -> Self {
        let task_id = TaskId::new(task_request.pending_task_id(), started_at);
        Self {
            task_request,
            task_id,
            placement,
        }
    }

    pub fn task_request(&self) -> &TaskRequest {
        &self.task_request
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }
}
