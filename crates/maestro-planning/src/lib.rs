#![warn(missing_docs)]

//! Maestro planning
//!
//! Turns a high-level goal into a complete workflow plan: decomposition into
//! steps, dependency-graph construction with topological batching, resource-
//! constrained scheduling with critical-path analysis, progress milestones,
//! and risk assessment.

pub mod dependency;
pub mod error;
pub mod goal;
pub mod milestones;
pub mod models;
pub mod planner;
pub mod risk;
pub mod scheduler;

#[cfg(test)]
mod dependency_properties;

#[cfg(test)]
mod milestone_properties;

#[cfg(test)]
mod scheduling_properties;

pub use dependency::DependencyAnalyzer;
pub use error::{PlanningError, PlanningResult};
pub use goal::{Capability, Complexity, GoalClassifier, GoalKind, GoalProfile, KeywordClassifier};
pub use milestones::MilestoneTracker;
pub use models::*;
pub use planner::{DecompositionStrategy, TaskPlanner};
pub use risk::RiskAssessor;
pub use scheduler::{ResourceLimits, TaskScheduler};
