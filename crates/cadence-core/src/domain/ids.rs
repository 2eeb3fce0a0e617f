//! Composite identifiers and their string codecs.
//!
//! Every identifier here is stored as a node name in the coordination store, so
//! the string form is part of the persisted format:
//!
//! - `PendingRequestId`: `{requestId}-{REASON}-{timestamp}`
//! - `PendingTaskId`: `{requestId}-{nextRunAt}-{instanceNo}`
//! - `TaskId`: `{requestId}-{nextRunAt}-{instanceNo}-{startedAt}`
//!
//! Decoding always splits from the right a fixed number of times, so a
//! `requestId` may itself contain the delimiter.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between identifier fields.
pub const ID_DELIMITER: char = '-';

/// A node name did not decode into the expected identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} '{input}': {reason}")]
pub struct IdParseError {
    kind: &'static str,
    input: String,
    reason: String,
}

impl IdParseError {
    fn new(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Split `input` into exactly `n` fields, cutting only at the last `n - 1`
/// delimiters. Returns `None` when there are fewer than `n - 1` delimiters.
fn reverse_split(input: &str, n: usize) -> Option<Vec<&str>> {
    let mut fields: Vec<&str> = input.rsplitn(n, ID_DELIMITER).collect();
    if fields.len() != n {
        return None;
    }
    fields.reverse();
    Some(fields)
}

/// Numeric fields must be in canonical form (`5`, not `+5` or `005`), so that
/// every id has exactly one node name.
fn parse_field<T: FromStr + ToString>(
    kind: &'static str,
    input: &str,
    name: &str,
    raw: &str,
) -> Result<T, IdParseError> {
    let value: T = raw
        .parse()
        .map_err(|_| IdParseError::new(kind, input, format!("{name} '{raw}' is not a number")))?;
    if value.to_string() != raw {
        return Err(IdParseError::new(
            kind,
            input,
            format!("{name} '{raw}' is not in canonical form"),
        ));
    }
    Ok(value)
}

/// A request id has to fit in one store path segment.
pub(crate) fn check_request_id(request_id: &str) -> Result<(), IdParseError> {
    if request_id.is_empty() || request_id.contains('/') {
        return Err(IdParseError::new(
            "request id",
            request_id,
            "must be a single non-empty path segment",
        ));
    }
    Ok(())
}

fn parse_instance_no(kind: &'static str, input: &str, raw: &str) -> Result<u32, IdParseError> {
    let instance_no: u32 = parse_field(kind, input, "instanceNo", raw)?;
    if instance_no == 0 {
        return Err(IdParseError::new(kind, input, "instanceNo must be at least 1"));
    }
    Ok(instance_no)
}

// ========================================
// PendingRequestId
// ========================================

/// Why a new run of a request is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingReason {
    /// The cron schedule fired.
    Scheduled,
    /// A user asked for a run.
    Manual,
    /// The definition changed.
    Updated,
    /// Scheduler start-up reconciliation.
    Startup,
    /// A previous task finished and the request wants another.
    TaskDone,
}

impl PendingReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingReason::Scheduled => "SCHEDULED",
            PendingReason::Manual => "MANUAL",
            PendingReason::Updated => "UPDATED",
            PendingReason::Startup => "STARTUP",
            PendingReason::TaskDone => "TASK_DONE",
        }
    }
}

impl fmt::Display for PendingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(PendingReason::Scheduled),
            "MANUAL" => Ok(PendingReason::Manual),
            "UPDATED" => Ok(PendingReason::Updated),
            "STARTUP" => Ok(PendingReason::Startup),
            "TASK_DONE" => Ok(PendingReason::TaskDone),
            _ => Err(()),
        }
    }
}

/// Marker identity for "a new run of this request is pending".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestId {
    request_id: String,
    reason: PendingReason,
    timestamp: u64,
}

impl PendingRequestId {
    pub fn new(request_id: impl Into<String>, reason: PendingReason, timestamp: u64) -> Self {
        Self {
            request_id: request_id.into(),
            reason,
            timestamp,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn reason(&self) -> PendingReason {
        self.reason
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl fmt::Display for PendingRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.request_id, self.reason, self.timestamp)
    }
}

impl FromStr for PendingRequestId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "pending request id";
        let fields = reverse_split(s, 3)
            .ok_or_else(|| IdParseError::new(KIND, s, "expected 3 fields"))?;
        let reason = fields[1].parse().map_err(|_| {
            IdParseError::new(KIND, s, format!("unknown reason '{}'", fields[1]))
        })?;
        let timestamp = parse_field(KIND, s, "timestamp", fields[2])?;
        Ok(Self::new(fields[0], reason, timestamp))
    }
}

// ========================================
// PendingTaskId
// ========================================

/// Identity of one intended task launch.
///
/// Ordered by [`dispatch_order`], which is the dispatch priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTaskId {
    request_id: String,
    next_run_at: u64,
    instance_no: u32,
}

impl PendingTaskId {
    pub fn new(request_id: impl Into<String>, next_run_at: u64, instance_no: u32) -> Self {
        Self {
            request_id: request_id.into(),
            next_run_at,
            instance_no,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Intended dispatch time (epoch millis).
    pub fn next_run_at(&self) -> u64 {
        self.next_run_at
    }

    pub fn instance_no(&self) -> u32 {
        self.instance_no
    }

    /// Ids belonging to `request_id`, in input order.
    pub fn filter<'a>(
        ids: impl IntoIterator<Item = &'a PendingTaskId>,
        request_id: &str,
    ) -> Vec<PendingTaskId> {
        ids.into_iter()
            .filter(|id| id.request_id == request_id)
            .cloned()
            .collect()
    }
}

/// Dispatch priority: earliest `next_run_at`, then `request_id`, then `instance_no`.
pub fn dispatch_order(a: &PendingTaskId, b: &PendingTaskId) -> Ordering {
    a.next_run_at
        .cmp(&b.next_run_at)
        .then_with(|| a.request_id.cmp(&b.request_id))
        .then_with(|| a.instance_no.cmp(&b.instance_no))
}

impl Ord for PendingTaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        dispatch_order(self, other)
    }
}

impl PartialOrd for PendingTaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PendingTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.request_id, self.next_run_at, self.instance_no)
    }
}

impl FromStr for PendingTaskId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "pending task id";
        let fields = reverse_split(s, 3)
            .ok_or_else(|| IdParseError::new(KIND, s, "expected 3 fields"))?;
        let next_run_at = parse_field(KIND, s, "nextRunAt", fields[1])?;
        let instance_no = parse_instance_no(KIND, s, fields[2])?;
        Ok(Self::new(fields[0], next_run_at, instance_no))
    }
}

// ========================================
// TaskId
// ========================================

/// Identity of a launched task: the pending identity plus its launch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskId {
    request_id: String,
    next_run_at: u64,
    instance_no: u32,
    started_at: u64,
}

impl TaskId {
    pub fn new(pending: &PendingTaskId, started_at: u64) -> Self {
        Self {
            request_id: pending.request_id.clone(),
            next_run_at: pending.next_run_at,
            instance_no: pending.instance_no,
            started_at,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn instance_no(&self) -> u32 {
        self.instance_no
    }

    /// Launch time (epoch millis).
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn pending_task_id(&self) -> PendingTaskId {
        PendingTaskId::new(self.request_id.clone(), self.next_run_at, self.instance_no)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.request_id, self.next_run_at, self.instance_no, self.started_at
        )
    }
}

impl FromStr for TaskId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "task id";
        let fields = reverse_split(s, 4)
            .ok_or_else(|| IdParseError::new(KIND, s, "expected 4 fields"))?;
        let next_run_at = parse_field(KIND, s, "nextRunAt", fields[1])?;
        let instance_no = parse_instance_no(KIND, s, fields[2])?;
        let started_at = parse_field(KIND, s, "startedAt", fields[3])?;
        Ok(Self {
            request_id: fields[0].to_string(),
            next_run_at,
            instance_no,
            started_at,
        })
    }
}
