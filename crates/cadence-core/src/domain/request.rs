//! Request definitions: what users submit and what gets persisted.
//!
//! `RequestSubmission` is the raw, possibly invalid input. Only
//! `validation::validate` turns it into a `RequestDefinition`, which is the
//! immutable value stored under `/requests/active/{id}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationResult};

/// Resources one task instance needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub cpus: f64,
    pub memory_mb: f64,
    #[serde(default)]
    pub num_ports: u32,
}

/// User input as received at the boundary. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestSubmission {
    pub id: Option<String>,
    pub name: Option<String>,
    pub command: Option<String>,
    pub executor: Option<String>,
    pub executor_data: Option<serde_json::Value>,
    pub resources: Option<Resources>,
    pub schedule: Option<String>,
    /// Signed so that zero and negative counts can be rejected rather than
    /// failing to deserialize.
    pub instances: Option<i64>,
    pub daemon: Option<bool>,
    pub rack_sensitive: Option<bool>,
    pub env: Option<BTreeMap<String, String>>,
    pub uris: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub version: Option<String>,
    pub timestamp: Option<i64>,
}

impl RequestSubmission {
    pub fn validate(self) -> ValidationResult<RequestDefinition> {
        validation::validate(self)
    }
}

/// A validated, canonical request definition.
///
/// Construct through [`RequestSubmission::validate`]; fields are read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefinition {
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) executor_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) resources: Option<Resources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) schedule: Option<String>,
    pub(crate) instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) daemon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) rack_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) timestamp: Option<i64>,
}

impl RequestDefinition {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn executor(&self) -> Option<&str> {
        self.executor.as_deref()
    }

    pub fn executor_data(&self) -> Option<&serde_json::Value> {
        self.executor_data.as_ref()
    }

    pub fn resources(&self) -> Option<&Resources> {
        self.resources.as_ref()
    }

    /// Canonical 6/7-field cron schedule.
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    pub fn instances(&self) -> u32 {
        self.instances
    }

    pub fn daemon(&self) -> Option<bool> {
        self.daemon
    }

    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        self.env.as_ref()
    }

    pub fn uris(&self) -> &[String] {
        self.uris.as_deref().unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn is_rack_sensitive(&self) -> bool {
        self.rack_sensitive.unwrap_or(false)
    }

    /// Daemons keep `instances` tasks running at all times. An absent `daemon`
    /// flag means daemon, unless the request is scheduled.
    pub fn always_running(&self) -> bool {
        self.daemon.unwrap_or(true) && !self.is_scheduled()
    }

    /// Back to the submission form, e.g. to re-validate after edits.
    pub fn to_submission(&self) -> RequestSubmission {
        RequestSubmission {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            command: self.command.clone(),
            executor: self.executor.clone(),
            executor_data: self.executor_data.clone(),
            resources: self.resources.clone(),
            schedule: self.schedule.clone(),
            instances: Some(i64::from(self.instances)),
            daemon: self.daemon,
            rack_sensitive: self.rack_sensitive,
            env: self.env.clone(),
            uris: self.uris.clone(),
            metadata: self.metadata.clone(),
            version: self.version.clone(),
            timestamp: self.timestamp,
        }
    }

    /// A copy with `patch` applied, as a submission that still has to pass
    /// validation. `self` is left untouched.
    pub fn with_overrides(&self, patch: &RequestPatch) -> RequestSubmission {
        let mut submission = self.to_submission();
        if let Some(name) = &patch.name {
            submission.name = Some(name.clone());
        }
        if let Some(command) = &patch.command {
            submission.command = Some(command.clone());
        }
        if let Some(resources) = &patch.resources {
            submission.resources = Some(resources.clone());
        }
        if let Some(schedule) = &patch.schedule {
            submission.schedule = Some(schedule.clone());
        }
        if let Some(instances) = patch.instances {
            submission.instances = Some(instances);
        }
        if let Some(daemon) = patch.daemon {
            submission.daemon = Some(daemon);
        }
        if let Some(env) = &patch.env {
            submission.env = Some(env.clone());
        }
        if let Some(version) = &patch.version {
            submission.version = Some(version.clone());
        }
        if let Some(timestamp) = patch.timestamp {
            submission.timestamp = Some(timestamp);
        }
        submission
    }
}

/// Fields a caller may override on an existing definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestPatch {
    pub name: Option<String>,
    pub command: Option<String>,
    pub resources: Option<Resources>,
    pub schedule: Option<String>,
    pub instances: Option<i64>,
    pub daemon: Option<bool>,
    pub env: Option<BTreeMap<String, String>>,
    pub version: Option<String>,
    pub timestamp: Option<i64>,
}
