//! Task lifecycle: pending scheduling markers and active tasks.
//!
//! ```text
//! {pending_tasks_root}/{pendingTaskId}   empty marker
//! {active_tasks_root}/{taskId}           serialized Task
//! ```
//!
//! `launch` removes the pending marker before creating the active node. The
//! store has no multi-key transaction, so a crash between the two steps leaves
//! the task in neither subtree; reconciliation reschedules such tasks from
//! their request definition.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::StoreLayout;
use crate::domain::{PendingTaskId, StoredValue, Task, TaskId};
use crate::error::{CadenceError, Result};
use crate::ports::{CoordinationStore, Parents, StoreError, child_path};

use super::listing::{Listing, MarkerOutcome, RemovalOutcome};
use super::store_ops::StoreOps;

/// Per-id outcome of [`TaskManager::schedule`].
#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub created: Vec<PendingTaskId>,
    pub already_pending: Vec<PendingTaskId>,
    pub failed: Vec<(PendingTaskId, CadenceError)>,
}

impl ScheduleReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids that now have a marker, whether this call created it or not.
    pub fn scheduled(&self) -> impl Iterator<Item = &PendingTaskId> {
        self.created.iter().chain(self.already_pending.iter())
    }
}

#[derive(Clone)]
pub struct TaskManager {
    ops: StoreOps,
    active_root: String,
    pending_root: String,
}

impl TaskManager {
    pub fn new(store: Arc<dyn CoordinationStore>, layout: &StoreLayout) -> Self {
        Self {
            ops: StoreOps::new(store),
            active_root: layout.active_tasks_root.clone(),
            pending_root: layout.pending_tasks_root.clone(),
        }
    }

    fn pending_path(&self, task_id: &PendingTaskId) -> String {
        child_path(&self.pending_root, &task_id.to_string())
    }

    fn active_path(&self, task_id: &TaskId) -> String {
        child_path(&self.active_root, &task_id.to_string())
    }

    /// Create a pending marker for every id. One failing id does not stop
    /// the rest.
    #[instrument(skip_all, fields(count = task_ids.len()))]
    pub async fn schedule(&self, task_ids: &[PendingTaskId]) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        for task_id in task_ids {
            match self.ops.create_marker(&self.pending_path(task_id)).await {
                Ok(MarkerOutcome::Created) => report.created.push(task_id.clone()),
                Ok(MarkerOutcome::AlreadyPresent) => report.already_pending.push(task_id.clone()),
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "failed to schedule task");
                    report.failed.push((task_id.clone(), err));
                }
            }
        }
        debug!(
            created = report.created.len(),
            already_pending = report.already_pending.len(),
            failed = report.failed.len(),
            "scheduled tasks"
        );
        report
    }

    pub async fn pending_task_ids(&self) -> Result<Listing<PendingTaskId>> {
        let names = self.ops.children(&self.pending_root).await?;
        Ok(Listing::decode(&self.pending_root, names))
    }

    /// Pending ids of one request, in dispatch order.
    pub async fn pending_for_request(&self, request_id: &str) -> Result<Vec<PendingTaskId>> {
        let listing = self.pending_task_ids().await?;
        let mut ids = PendingTaskId::filter(&listing.entries, request_id);
        ids.sort();
        Ok(ids)
    }

    pub async fn active_task_ids(&self) -> Result<Listing<TaskId>> {
        let names = self.ops.children(&self.active_root).await?;
        Ok(Listing::decode(&self.active_root, names))
    }

    pub async fn num_pending_tasks(&self) -> Result<usize> {
        self.ops.num_children(&self.pending_root).await
    }

    pub async fn num_active_tasks(&self) -> Result<usize> {
        self.ops.num_children(&self.active_root).await
    }

    pub async fn active_task(&self, task_id: &TaskId) -> Result<Option<Task>> {
        self.ops.read(&self.active_path(task_id)).await
    }

    /// All active tasks. Tasks torn down between the listing and the read
    /// are left out.
    pub async fn active_tasks(&self) -> Result<Vec<Task>> {
        let listing = self.active_task_ids().await?;
        let mut tasks = Vec::with_capacity(listing.len());
        for task_id in &listing.entries {
            match self.active_task(task_id).await? {
                Some(task) => tasks.push(task),
                None => info!(task_id = %task_id, "active task vanished before it could be read"),
            }
        }
        Ok(tasks)
    }

    /// Promote a pending task to active.
    ///
    /// A missing pending marker is tolerated. An existing active node means
    /// the task was already launched and fails with `Conflict`.
    #[instrument(skip(self, task), fields(task_id = %task.task_id()))]
    pub async fn launch(&self, task: &Task) -> Result<()> {
        let pending = task.task_request().pending_task_id();
        if self.ops.remove(&self.pending_path(pending)).await? == RemovalOutcome::AlreadyAbsent {
            debug!(pending = %pending, "launching task without a pending marker");
        }

        let bytes = task.to_bytes()?;
        match self
            .ops
            .store()
            .create(&self.active_path(task.task_id()), &bytes, Parents::Create)
            .await
        {
            Ok(()) => {
                info!("task launched");
                Ok(())
            }
            Err(StoreError::NodeExists(_)) => Err(CadenceError::Conflict(format!(
                "task {} is already active",
                task.task_id()
            ))),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn teardown(&self, task_id: &TaskId) -> Result<RemovalOutcome> {
        let outcome = self.ops.remove(&self.active_path(task_id)).await?;
        if outcome == RemovalOutcome::Removed {
            info!("task torn down");
        }
        Ok(outcome)
    }
}
