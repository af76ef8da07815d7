#![warn(missing_docs)]

//! Maestro execution
//!
//! Drives planned workflows to completion: checkpointed state tracking with
//! rollback, failure classification and recovery, human-in-the-loop approval
//! and intervention gates, and a façade composing planning with execution.

pub mod approval;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod executor;
pub mod intervention;
pub mod notifications;
pub mod overrides;
pub mod recovery;
pub mod rollback;
pub mod state;
pub mod workflow;

#[cfg(test)]
mod checkpoint_properties;

#[cfg(test)]
mod recovery_properties;

pub use approval::{ApprovalManager, ApprovalOutcome, ApprovalRule, APPROVAL_OPTIONS};
pub use checkpoint::{CheckpointData, CheckpointManager};
pub use engine::{ExecutionConfig, ExecutionEngine};
pub use error::{ExecutionError, ExecutionResult};
pub use executor::{StepExecutor, StepOutcome};
pub use intervention::{Intervention, InterventionManager};
pub use notifications::{
    Notification, NotificationKind, NotificationListener, NotificationManager,
    NotificationPriority,
};
pub use overrides::{OverrideHandler, OverrideManager, OverrideRequest, OverrideStatus};
pub use recovery::{FailureCategory, RecoveryAction, RecoveryEngine, MANUAL_OPTIONS};
pub use rollback::{NoopRestorer, ResourceRestorer, RollbackManager, RollbackRecord};
pub use state::{ExecutionState, StateManager, StateTransition};
pub use workflow::WorkflowEngine;
