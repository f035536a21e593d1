use crate::capacity::{WORKING_DAYS_PER_WEEK, aggregate_capacity};
use crate::demand::{DemandMapping, RoleHours, aggregate_demand};
use crate::distribution::{MemberCost, distribute_costs};
use crate::duration::{RoleLoad, resolve_duration};
use crate::fixed::{calculate_fixed_costs, calculate_total_hours, fixed_costs_by_category};
use estimate_core::project::{FixedCostCategory, ProjectData};
use serde::Serialize;
use std::collections::BTreeMap;

/// Knobs the engine treats as fixed in everyday use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostModel {
    pub demand_mapping: DemandMapping,
    pub working_days_per_week: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            demand_mapping: DemandMapping::standard(),
            working_days_per_week: WORKING_DAYS_PER_WEEK,
        }
    }
}

impl CostModel {
    pub fn tiered_review() -> Self {
        Self {
            demand_mapping: DemandMapping::tiered_review(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostCalculation {
    /// Labor cost only.
    pub total: f64,
    pub breakdown: Vec<MemberCost>,
    pub demand: RoleHours,
    /// Weekly hours per role.
    pub capacity: RoleHours,
    pub duration_weeks: u32,
    pub bottleneck_role: Option<String>,
    pub unstaffed_roles: Vec<String>,
    pub role_loads: Vec<RoleLoad>,
}

impl CostCalculation {
    /// Share of committed hours a role actually spends on work:
    /// `demand / (weekly capacity × duration)`.
    pub fn utilization(&self, role: &str) -> Option<f64> {
        let capacity = self.capacity.get(role).copied().unwrap_or(0.0);
        if capacity <= 0.0 || self.duration_weeks == 0 {
            return None;
        }
        let demand = self.demand.get(role).copied().unwrap_or(0.0);
        Some(demand / (capacity * f64::from(self.duration_weeks)))
    }

    pub fn member(&self, member_id: &str) -> Option<&MemberCost> {
        self.breakdown.iter().find(|m| m.member_id == member_id)
    }
}

pub fn calculate_project_costs(project: &ProjectData) -> CostCalculation {
    calculate_with_model(project, &CostModel::default())
}

pub fn calculate_with_model(project: &ProjectData, model: &CostModel) -> CostCalculation {
    let demand = aggregate_demand(&project.chapters, &model.demand_mapping);
    let capacity = aggregate_capacity(&project.team_members, model.working_days_per_week);
    let resolution = resolve_duration(&demand, &capacity);
    let distribution = distribute_costs(
        &project.team_members,
        resolution.weeks,
        model.working_days_per_week,
    );

    tracing::debug!(
        weeks = resolution.weeks,
        bottleneck = resolution.bottleneck_role.as_deref().unwrap_or("-"),
        total = distribution.total,
        "calculated project costs"
    );

    CostCalculation {
        total: distribution.total,
        breakdown: distribution.members,
        demand,
        capacity,
        duration_weeks: resolution.weeks,
        bottleneck_role: resolution.bottleneck_role,
        unstaffed_roles: resolution.unstaffed_roles,
        role_loads: resolution.roles,
    }
}

/// Dashboard summary: labor plus fixed costs, and the raw effort figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEstimate {
    pub calculation: CostCalculation,
    pub fixed_costs: f64,
    pub fixed_costs_by_category: BTreeMap<FixedCostCategory, f64>,
    pub labor_costs: f64,
    pub grand_total: f64,
    pub total_hours: f64,
}

pub fn estimate_project(project: &ProjectData) -> ProjectEstimate {
    estimate_with_model(project, &CostModel::default())
}

pub fn estimate_with_model(project: &ProjectData, model: &CostModel) -> ProjectEstimate {
    let calculation = calculate_with_model(project, model);
    let fixed_costs = calculate_fixed_costs(project);
    let labor_costs = calculation.total;
    ProjectEstimate {
        fixed_costs,
        fixed_costs_by_category: fixed_costs_by_category(project),
        labor_costs,
        grand_total: labor_costs + fixed_costs,
        total_hours: calculate_total_hours(project),
        calculation,
    }
}
