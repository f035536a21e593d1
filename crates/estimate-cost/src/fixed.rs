use estimate_core::project::{FixedCostCategory, ProjectData};
use std::collections::BTreeMap;

/// Flat sum of every fixed cost, regardless of duration or staffing.
pub fn calculate_fixed_costs(project: &ProjectData) -> f64 {
    project
        .fixed_costs
        .iter()
        .map(|(_, cost)| cost.amount.max(0.0))
        .sum()
}

/// Subtotal per category; every category is present.
pub fn fixed_costs_by_category(project: &ProjectData) -> BTreeMap<FixedCostCategory, f64> {
    FixedCostCategory::ALL
        .into_iter()
        .map(|category| {
            let subtotal = project
                .fixed_costs
                .category(category)
                .iter()
                .map(|cost| cost.amount.max(0.0))
                .sum();
            (category, subtotal)
        })
        .collect()
}

/// Raw effort across the whole tree, ignoring roles and capacity.
pub fn calculate_total_hours(project: &ProjectData) -> f64 {
    project.subsections().map(|s| s.total_hours()).sum()
}
