//! Domain model: identifiers, request definitions, tasks, validation.

pub mod codec;
pub mod ids;
pub mod request;
pub mod task;
pub mod validation;

pub use codec::StoredValue;
pub use ids::{
    ID_DELIMITER, IdParseError, PendingReason, PendingRequestId, PendingTaskId, TaskId,
    dispatch_order,
};
pub use request::{RequestDefinition, RequestPatch, RequestSubmission, Resources};
pub use task::{Placement, Task, TaskRequest};
pub use validation::{ValidationResult, normalize_schedule, validate};
