mod executor;
mod planner;
mod types;

pub use executor::{execute_operations, CancelToken, ExecutionOutcome};
pub use planner::{plan_operations, PlanError};
pub use types::{
    OperationKind, OperationStatus, ProgressUpdate, RenameOperation, RollbackEntry, SkipReason,
};
