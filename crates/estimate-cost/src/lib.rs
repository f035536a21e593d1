//! Duration and cost estimation for a project's work tree and roster.
//!
//! The pipeline is demand per role, weekly capacity per role, the bottleneck
//! duration in whole weeks, and finally what the roster costs over that
//! duration. Every function is pure over its inputs.

pub mod calculation;
pub mod capacity;
pub mod demand;
pub mod distribution;
pub mod duration;
pub mod fixed;

pub use calculation::{
    CostCalculation, CostModel, ProjectEstimate, calculate_project_costs, calculate_with_model,
    estimate_project, estimate_with_model,
};
pub use capacity::{WORKING_DAYS_PER_WEEK, aggregate_capacity};
pub use demand::{DemandMapping, DemandRule, EffortField, RoleHours, aggregate_demand};
pub use distribution::{AllocationCost, CostDistribution, MemberCost, distribute_costs};
pub use duration::{DurationResolution, RoleLoad, resolve_duration};
pub use fixed::{calculate_fixed_costs, calculate_total_hours, fixed_costs_by_category};
