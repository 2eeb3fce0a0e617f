//! Collaborator ports read by the host state snapshot.
//!
//! The cluster-manager driver and offer loop live outside this crate; they
//! only report what they know through these traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state of the cluster-manager driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    NotStarted,
    Running,
    Aborted,
    Stopped,
}

pub trait ClusterView: Send + Sync {
    /// Whether this replica currently holds scheduler leadership.
    fn is_leader(&self) -> bool;

    fn driver_status(&self) -> DriverStatus;

    /// When the last resource offer arrived, if any has.
    fn last_offer_at(&self) -> Option<DateTime<Utc>>;

    /// `host:port` of the elected cluster master.
    fn master_address(&self) -> Option<String>;
}

/// Local host identity.
pub trait HostInfo: Send + Sync {
    fn hostname(&self) -> Option<String>;

    fn host_address(&self) -> Option<String>;
}

/// Resolves identity from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl HostInfo for LocalHost {
    fn hostname(&self) -> Option<String> {
        hostname::get().ok().and_then(|name| name.into_string().ok())
    }

    fn host_address(&self) -> Option<String> {
        use std::net::ToSocketAddrs;

        let hostname = self.hostname()?;
        (hostname.as_str(), 0)
            .to_socket_addrs()
            .ok()?
            .find(|addr| addr.is_ipv4())
            .map(|addr| addr.ip().to_string())
    }
}
