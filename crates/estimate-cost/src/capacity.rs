use crate::demand::RoleHours;
use estimate_core::project::TeamMember;

/// Working days in the week the engine bills against. Independent of the
/// project's philosophy, which only describes the preferred pace.
pub const WORKING_DAYS_PER_WEEK: f64 = 5.0;

/// Weekly hours each role can absorb, summed across every member's allocations.
/// Roles nobody is allocated to are absent.
pub fn aggregate_capacity(members: &[TeamMember], working_days_per_week: f64) -> RoleHours {
    let mut capacity = RoleHours::new();
    for allocation in members.iter().flat_map(|m| m.allocations.iter()) {
        *capacity.entry(allocation.role.clone()).or_insert(0.0) +=
            allocation.weekly_hours(working_days_per_week).max(0.0);
    }
    capacity
}
