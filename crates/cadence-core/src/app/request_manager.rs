//! Request lifecycle: active definitions, pending-run queue, cleanup queue.
//!
//! ```text
//! {requests_root}/active/{requestId}          serialized RequestDefinition
//! {requests_root}/pending/{pendingRequestId}  empty marker
//! {requests_root}/cleanup/{requestId}         empty marker
//! ```
//!
//! A deleted request first gets a cleanup marker and only then loses its
//! active node. A crash in between leaves the marker, which is enough for a
//! recovery sweep to finish the job.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::StoreLayout;
use crate::domain::ids::check_request_id;
use crate::domain::{PendingRequestId, PendingTaskId, RequestDefinition, StoredValue, TaskRequest};
use crate::error::{CadenceError, Result};
use crate::ports::{CoordinationStore, Parents, StoreError, child_path};

use super::listing::{Listing, MarkerOutcome, PersistOutcome, RemovalOutcome};
use super::store_ops::StoreOps;

#[derive(Clone)]
pub struct RequestManager {
    ops: StoreOps,
    active_root: String,
    pending_root: String,
    cleanup_root: String,
}

impl RequestManager {
    pub fn new(store: Arc<dyn CoordinationStore>, layout: &StoreLayout) -> Self {
        Self {
            ops: StoreOps::new(store),
            active_root: layout.active_requests_root(),
            pending_root: layout.pending_requests_root(),
            cleanup_root: layout.cleanup_requests_root(),
        }
    }

    fn request_path(&self, request_id: &str) -> String {
        child_path(&self.active_root, request_id)
    }

    fn pending_path(&self, pending: &PendingRequestId) -> String {
        child_path(&self.pending_root, &pending.to_string())
    }

    fn cleanup_path(&self, request_id: &str) -> String {
        child_path(&self.cleanup_root, request_id)
    }

    // ========================================
    // Queue depths
    // ========================================

    pub async fn pending_queue_size(&self) -> Result<usize> {
        self.ops.num_children(&self.pending_root).await
    }

    pub async fn cleanup_queue_size(&self) -> Result<usize> {
        self.ops.num_children(&self.cleanup_root).await
    }

    pub async fn num_requests(&self) -> Result<usize> {
        self.ops.num_children(&self.active_root).await
    }

    // ========================================
    // Pending / cleanup markers
    // ========================================

    /// Queue a new run. Enqueuing the same id twice leaves one marker.
    #[instrument(skip(self), fields(pending = %pending))]
    pub async fn enqueue_pending_run(&self, pending: &PendingRequestId) -> Result<MarkerOutcome> {
        check_request_id(pending.request_id())?;
        let outcome = self.ops.create_marker(&self.pending_path(pending)).await?;
        if outcome == MarkerOutcome::AlreadyPresent {
            debug!("pending run already queued");
        }
        Ok(outcome)
    }

    #[instrument(skip(self), fields(pending = %pending))]
    pub async fn dequeue_pending_run(&self, pending: &PendingRequestId) -> Result<RemovalOutcome> {
        check_request_id(pending.request_id())?;
        self.ops.remove(&self.pending_path(pending)).await
    }

    #[instrument(skip(self))]
    pub async fn mark_for_cleanup(&self, request_id: &str) -> Result<MarkerOutcome> {
        check_request_id(request_id)?;
        self.ops.create_marker(&self.cleanup_path(request_id)).await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cleanup(&self, request_id: &str) -> Result<RemovalOutcome> {
        check_request_id(request_id)?;
        self.ops.remove(&self.cleanup_path(request_id)).await
    }

    // ========================================
    // Definitions
    // ========================================

    /// Create or overwrite the active definition.
    ///
    /// Refused with `Conflict` while a cleanup marker exists for the id.
    /// Concurrent writers of the same id race; the last overwrite wins.
    #[instrument(skip(self, definition), fields(request_id = %definition.id()))]
    pub async fn persist(&self, definition: &RequestDefinition) -> Result<PersistOutcome> {
        let request_id = definition.id();
        if self.ops.store().exists(&self.cleanup_path(request_id)).await? {
            return Err(CadenceError::Conflict(format!(
                "A cleanup request exists for {request_id}"
            )));
        }

        let path = self.request_path(request_id);
        let bytes = definition.to_bytes()?;

        match self.ops.store().create(&path, &bytes, Parents::Create).await {
            Ok(()) => {
                info!("created request");
                Ok(PersistOutcome::Created)
            }
            Err(StoreError::NodeExists(_)) => match self.ops.store().set_data(&path, &bytes).await {
                Ok(()) => {
                    info!("updated request");
                    Ok(PersistOutcome::Updated)
                }
                Err(StoreError::NoNode(_)) => Err(CadenceError::Conflict(format!(
                    "request {request_id} was deleted while being updated"
                ))),
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    /// The active definition, or `None` if there is none.
    pub async fn fetch(&self, request_id: &str) -> Result<Option<RequestDefinition>> {
        check_request_id(request_id)?;
        self.ops.read(&self.request_path(request_id)).await
    }

    /// Soft delete: mark for cleanup, then remove the active node.
    ///
    /// Returns the definition that was removed, or `None` (and changes
    /// nothing) if the request did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, request_id: &str) -> Result<Option<RequestDefinition>> {
        let Some(definition) = self.fetch(request_id).await? else {
            debug!("no active request to delete");
            return Ok(None);
        };

        self.mark_for_cleanup(request_id).await?;

        if self.ops.remove(&self.request_path(request_id)).await? == RemovalOutcome::AlreadyAbsent {
            warn!("couldn't find request to delete, it was removed concurrently");
        } else {
            info!("request moved to cleanup");
        }
        Ok(Some(definition))
    }

    // ========================================
    // Bulk reads
    // ========================================

    pub async fn request_ids(&self) -> Result<Vec<String>> {
        self.ops.children(&self.active_root).await
    }

    pub async fn pending_requests(&self) -> Result<Listing<PendingRequestId>> {
        let names = self.ops.children(&self.pending_root).await?;
        Ok(Listing::decode(&self.pending_root, names))
    }

    pub async fn cleanup_request_ids(&self) -> Result<Vec<String>> {
        self.ops.children(&self.cleanup_root).await
    }

    /// Every active definition. Ids that disappear between the listing and
    /// the read are skipped.
    pub async fn known_requests(&self) -> Result<Vec<RequestDefinition>> {
        let request_ids = self.request_ids().await?;
        let mut requests = Vec::with_capacity(request_ids.len());
        for request_id in request_ids {
            match self.fetch(&request_id).await? {
                Some(definition) => requests.push(definition),
                None => warn!(
                    request_id,
                    "while fetching requests, expected to find request but it was not found"
                ),
            }
        }
        Ok(requests)
    }

    /// Pair each pending task with the current definition of its request.
    /// Tasks whose request no longer exists are dropped.
    pub async fn fetch_task_requests(
        &self,
        task_ids: &[PendingTaskId],
    ) -> Result<Vec<TaskRequest>> {
        let mut tasks = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            match self.fetch(task_id.request_id()).await? {
                Some(definition) => tasks.push(TaskRequest::new(definition, task_id.clone())),
                None => debug!(task_id = %task_id, "request gone, dropping pending task"),
            }
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PendingReason, RequestSubmission};
    use crate::impls::InMemoryCoordinationStore;
    use crate::impls::faulty_store::FaultyStore;
    use rstest::rstest;

    fn setup() -> (Arc<InMemoryCoordinationStore>, RequestManager) {
        let store = Arc::new(InMemoryCoordinationStore::new());
        let manager = RequestManager::new(store.clone(), &StoreLayout::default());
        (store, manager)
    }

    fn definition(id: &str, command: &str) -> RequestDefinition {
        RequestSubmission {
            id: Some(id.into()),
            command: Some(command.into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn persist_creates_then_updates() {
        let (_, manager) = setup();

        let first = manager.persist(&definition("web", "v1")).await.unwrap();
        assert_eq!(first, PersistOutcome::Created);

        let second = manager.persist(&definition("web", "v2")).await.unwrap();
        assert_eq!(second, PersistOutcome::Updated);

        let stored = manager.fetch("web").await.unwrap().unwrap();
        assert_eq!(stored.command(), Some("v2"));
        assert_eq!(manager.num_requests().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn persist_is_refused_during_cleanup() {
        let (_, manager) = setup();
        manager.mark_for_cleanup("web").await.unwrap();

        let err = manager.persist(&definition("web", "v1")).await.unwrap_err();
        assert!(matches!(err, CadenceError::Conflict(_)));
        assert!(err.is_retryable());
        assert!(manager.fetch("web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn persist_after_cleanup_finished_succeeds() {
        let (_, manager) = setup();
        manager.persist(&definition("web", "v1")).await.unwrap();
        manager.delete("web").await.unwrap();
        manager.remove_from_cleanup("web").await.unwrap();

        let outcome = manager.persist(&definition("web", "v2")).await.unwrap();
        assert_eq!(outcome, PersistOutcome::Created);
    }

    #[tokio::test]
    async fn delete_unknown_request_is_not_found_without_side_effects() {
        let (store, manager) = setup();
        assert!(manager.delete("ghost").await.unwrap().is_none());
        assert!(manager.cleanup_request_ids().await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_moves_request_to_cleanup() {
        let (_, manager) = setup();
        manager.persist(&definition("web", "v1")).await.unwrap();

        let deleted = manager.delete("web").await.unwrap().unwrap();
        assert_eq!(deleted.id(), "web");

        assert!(manager.fetch("web").await.unwrap().is_none());
        assert_eq!(manager.cleanup_request_ids().await.unwrap(), vec!["web"]);
        assert_eq!(manager.cleanup_queue_size().await.unwrap(), 1);
        assert!(manager.request_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_marker_survives_failed_active_removal() {
        let store = Arc::new(FaultyStore::new().fail_delete("/requests/active/web"));
        let manager = RequestManager::new(store.clone(), &StoreLayout::default());
        manager.persist(&definition("web", "v1")).await.unwrap();

        let err = manager.delete("web").await.unwrap_err();
        assert!(matches!(err, CadenceError::StoreUnavailable(_)));

        assert_eq!(manager.cleanup_request_ids().await.unwrap(), vec!["web"]);
        assert!(manager.fetch("web").await.unwrap().is_some());
        let conflict = manager.persist(&definition("web", "v2")).await.unwrap_err();
        assert!(matches!(conflict, CadenceError::Conflict(_)));
    }

    #[rstest]
    #[case::nested("team/web")]
    #[case::empty("")]
    #[tokio::test]
    async fn raw_ids_must_be_path_segments(#[case] request_id: &str) {
        let (store, manager) = setup();

        for result in [
            manager.mark_for_cleanup(request_id).await.map(|_| ()),
            manager.remove_from_cleanup(request_id).await.map(|_| ()),
            manager.fetch(request_id).await.map(|_| ()),
            manager.delete(request_id).await.map(|_| ()),
            manager
                .enqueue_pending_run(&PendingRequestId::new(request_id, PendingReason::Manual, 1))
                .await
                .map(|_| ()),
        ] {
            assert!(matches!(result, Err(CadenceError::MalformedIdentifier(_))));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn pending_runs_are_idempotent_markers() {
        let (_, manager) = setup();
        let pending = PendingRequestId::new("etl", PendingReason::Scheduled, 1_000);

        assert_eq!(
            manager.enqueue_pending_run(&pending).await.unwrap(),
            MarkerOutcome::Created
        );
        assert_eq!(
            manager.enqueue_pending_run(&pending).await.unwrap(),
            MarkerOutcome::AlreadyPresent
        );
        assert_eq!(manager.pending_queue_size().await.unwrap(), 1);

        let listing = manager.pending_requests().await.unwrap();
        assert_eq!(listing.entries, vec![pending.clone()]);

        assert_eq!(
            manager.dequeue_pending_run(&pending).await.unwrap(),
            RemovalOutcome::Removed
        );
        assert_eq!(
            manager.dequeue_pending_run(&pending).await.unwrap(),
            RemovalOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn concurrent_enqueue_leaves_exactly_one_marker() {
        let (_, manager) = setup();
        let pending = PendingRequestId::new("etl", PendingReason::Manual, 42);

        let (a, b) = tokio::join!(
            manager.enqueue_pending_run(&pending),
            manager.enqueue_pending_run(&pending)
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == MarkerOutcome::AlreadyPresent);
        assert_eq!(
            outcomes,
            vec![MarkerOutcome::Created, MarkerOutcome::AlreadyPresent]
        );
        assert_eq!(manager.pending_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_enqueue_from_spawned_tasks() {
        let (_, manager) = setup();
        let pending = PendingRequestId::new("etl", PendingReason::Manual, 7);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let pending = pending.clone();
                tokio::spawn(async move { manager.enqueue_pending_run(&pending).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == MarkerOutcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(manager.pending_queue_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_pending_markers_are_skipped_and_recorded() {
        let (store, manager) = setup();
        let good = PendingRequestId::new("etl", PendingReason::Startup, 5);
        manager.enqueue_pending_run(&good).await.unwrap();
        store
            .create("/requests/pending/not-a-marker", &[], Parents::Create)
            .await
            .unwrap();

        let listing = manager.pending_requests().await.unwrap();
        assert_eq!(listing.entries, vec![good]);
        assert_eq!(listing.malformed.len(), 1);
        assert_eq!(listing.malformed[0].input(), "not-a-marker");
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let (_, manager) = setup();
        assert!(manager.request_ids().await.unwrap().is_empty());
        assert!(manager.pending_requests().await.unwrap().is_empty());
        assert_eq!(manager.num_requests().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn known_requests_and_task_requests() {
        let (_, manager) = setup();
        manager.persist(&definition("web", "serve")).await.unwrap();
        manager.persist(&definition("etl", "load")).await.unwrap();

        let mut ids: Vec<String> = manager
            .known_requests()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["etl", "web"]);

        let pending = vec![
            PendingTaskId::new("web", 10, 1),
            PendingTaskId::new("gone", 10, 1),
        ];
        let task_requests = manager.fetch_task_requests(&pending).await.unwrap();
        assert_eq!(task_requests.len(), 1);
        assert_eq!(task_requests[0].request().command(), Some("serve"));
        assert_eq!(task_requests[0].pending_task_id(), &pending[0]);
    }

    #[tokio::test]
    async fn request_deleted_between_listing_and_read_is_dropped() {
        let store = Arc::new(FaultyStore::new().vanish_on_read("/requests/active/etl"));
        let manager = RequestManager::new(store, &StoreLayout::default());
        manager.persist(&definition("web", "serve")).await.unwrap();
        manager.persist(&definition("etl", "load")).await.unwrap();
        manager.persist(&definition("cron", "tick")).await.unwrap();

        assert_eq!(manager.request_ids().await.unwrap().len(), 3);
        let mut ids: Vec<String> = manager
            .known_requests()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["cron", "web"]);
    }

    #[tokio::test]
    async fn store_outage_is_propagated_not_treated_as_absent() {
        let (store, manager) = setup();
        manager.persist(&definition("web", "v1")).await.unwrap();
        store.set_available(false);

        assert!(matches!(
            manager.fetch("web").await,
            Err(CadenceError::StoreUnavailable(_))
        ));
        assert!(matches!(
            manager.delete("web").await,
            Err(CadenceError::StoreUnavailable(_))
        ));
        assert!(matches!(
            manager.request_ids().await,
            Err(CadenceError::StoreUnavailable(_))
        ));

        store.set_available(true);
        assert!(manager.fetch("web").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn custom_layout_is_respected() {
        let store = Arc::new(InMemoryCoordinationStore::new());
        let layout = StoreLayout {
            requests_root: "/cadence/requests".into(),
            ..Default::default()
        };
        let manager = RequestManager::new(store.clone(), &layout);
        manager.persist(&definition("web", "v1")).await.unwrap();
        assert!(store.exists("/cadence/requests/active/web").await.unwrap());
    }
}
