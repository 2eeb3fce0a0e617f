//! Status - ホスト・クラスタ状態のスナップショット
//!
//! 協調ストアから読むのはキューの深さだけ。リーダー判定、ドライバ状態、
//! オファー時刻、マスターアドレスは ports 経由で外部から受け取ります。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::observability::QueueDepths;
use crate::ports::{Clock, ClusterView, DriverStatus, HostInfo};

use super::request_manager::RequestManager;
use super::task_manager::TaskManager;

const UNKNOWN: &str = "Unknown";

/// Read-only view of one scheduler replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    pub master: bool,
    pub driver_status: DriverStatus,
    pub uptime_millis: i64,
    /// `None` until the first offer arrives.
    pub millis_since_last_offer: Option<i64>,
    pub host_address: String,
    pub hostname: String,
    pub master_address: Option<String>,
    pub queue_depths: QueueDepths,
}

pub struct StateGenerator {
    requests: RequestManager,
    tasks: TaskManager,
    cluster: Arc<dyn ClusterView>,
    host: Arc<dyn HostInfo>,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
}

impl StateGenerator {
    /// Uptime is measured from the moment the generator is created.
    pub fn new(
        requests: RequestManager,
        tasks: TaskManager,
        cluster: Arc<dyn ClusterView>,
        host: Arc<dyn HostInfo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            requests,
            tasks,
            cluster,
            host,
            clock,
            started_at,
        }
    }

    pub async fn queue_depths(&self) -> Result<QueueDepths> {
        Ok(QueueDepths {
            active_requests: self.requests.num_requests().await?,
            pending_requests: self.requests.pending_queue_size().await?,
            cleanup_requests: self.requests.cleanup_queue_size().await?,
            active_tasks: self.tasks.num_active_tasks().await?,
            scheduled_tasks: self.tasks.num_pending_tasks().await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn state(&self) -> Result<HostState> {
        let now = self.clock.now();
        let queue_depths = self.queue_depths().await?;

        Ok(HostState {
            master: self.cluster.is_leader(),
            driver_status: self.cluster.driver_status(),
            uptime_millis: (now - self.started_at).num_milliseconds(),
            millis_since_last_offer: self
                .cluster
                .last_offer_at()
                .map(|at| (now - at).num_milliseconds()),
            host_address: self.host.host_address().unwrap_or_else(|| UNKNOWN.to_string()),
            hostname: self.host.hostname().unwrap_or_else(|| UNKNOWN.to_string()),
            master_address: self.cluster.master_address(),
            queue_depths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreLayout;
    use crate::domain::{PendingReason, PendingRequestId, PendingTaskId};
    use crate::error::CadenceError;
    use crate::impls::InMemoryCoordinationStore;
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};

    struct StaticCluster {
        last_offer_at: Option<DateTime<Utc>>,
    }

    impl ClusterView for StaticCluster {
        fn is_leader(&self) -> bool {
            true
        }

        fn driver_status(&self) -> DriverStatus {
            DriverStatus::Running
        }

        fn last_offer_at(&self) -> Option<DateTime<Utc>> {
            self.last_offer_at
        }

        fn master_address(&self) -> Option<String> {
            Some("10.0.0.1:5050".into())
        }
    }

    struct Nameless;

    impl HostInfo for Nameless {
        fn hostname(&self) -> Option<String> {
            None
        }

        fn host_address(&self) -> Option<String> {
            None
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn generator(
        store: Arc<InMemoryCoordinationStore>,
        clock: Arc<FixedClock>,
        last_offer_at: Option<DateTime<Utc>>,
    ) -> (StateGenerator, RequestManager, TaskManager) {
        let layout = StoreLayout::default();
        let requests = RequestManager::new(store.clone(), &layout);
        let tasks = TaskManager::new(store, &layout);
        let generator = StateGenerator::new(
            requests.clone(),
            tasks.clone(),
            Arc::new(StaticCluster { last_offer_at }),
            Arc::new(Nameless),
            clock,
        );
        (generator, requests, tasks)
    }

    #[tokio::test]
    async fn snapshot_combines_collaborators_and_depths() {
        let store = Arc::new(InMemoryCoordinationStore::new());
        let clock = Arc::new(FixedClock::new(start()));
        let (generator, requests, tasks) =
            generator(store, clock.clone(), Some(start() + Duration::seconds(30)));

        requests
            .enqueue_pending_run(&PendingRequestId::new("web", PendingReason::Manual, 1))
            .await
            .unwrap();
        requests.mark_for_cleanup("old").await.unwrap();
        tasks
            .schedule(&[PendingTaskId::new("web", 10, 1), PendingTaskId::new("web", 10, 2)])
            .await;

        clock.advance(Duration::minutes(1));
        let state = generator.state().await.unwrap();

        assert!(state.master);
        assert_eq!(state.driver_status, DriverStatus::Running);
        assert_eq!(state.uptime_millis, 60_000);
        assert_eq!(state.millis_since_last_offer, Some(30_000));
        assert_eq!(state.host_address, "Unknown");
        assert_eq!(state.hostname, "Unknown");
        assert_eq!(state.master_address.as_deref(), Some("10.0.0.1:5050"));
        assert_eq!(
            state.queue_depths,
            QueueDepths {
                active_requests: 0,
                pending_requests: 1,
                cleanup_requests: 1,
                active_tasks: 0,
                scheduled_tasks: 2,
            }
        );
    }

    #[tokio::test]
    async fn no_offer_yet_is_absent() {
        let store = Arc::new(InMemoryCoordinationStore::new());
        let clock = Arc::new(FixedClock::new(start()));
        let (generator, _, _) = generator(store, clock, None);

        let state = generator.state().await.unwrap();
        assert_eq!(state.uptime_millis, 0);
        assert!(state.millis_since_last_offer.is_none());
        assert_eq!(state.queue_depths, QueueDepths::default());
    }

    #[tokio::test]
    async fn store_outage_fails_the_snapshot() {
        let store = Arc::new(InMemoryCoordinationStore::new());
        let clock = Arc::new(FixedClock::new(start()));
        let (generator, _, _) = generator(store.clone(), clock, None);
        store.set_available(false);

        assert!(matches!(
            generator.state().await,
            Err(CadenceError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn serializes_in_camel_case() {
        let state = HostState {
            master: false,
            driver_status: DriverStatus::NotStarted,
            uptime_millis: 5,
            millis_since_last_offer: None,
            host_address: "127.0.0.1".into(),
            hostname: "box".into(),
            master_address: None,
            queue_depths: QueueDepths::default(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["driverStatus"], "NOT_STARTED");
        assert_eq!(json["queueDepths"]["scheduledTasks"], 0);
        assert_eq!(json["uptimeMillis"], 5);
    }
}
