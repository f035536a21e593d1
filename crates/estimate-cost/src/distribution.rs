//! Cost Distributor: budget-envelope billing.
//!
//! Every member is paid for their full committed hours across the whole
//! duration, whether or not their roles are the bottleneck.

use estimate_core::project::TeamMember;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationCost {
    pub role: String,
    /// Committed hours over the whole duration.
    pub hours: f64,
    pub rate: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberCost {
    pub member_id: String,
    pub member_name: String,
    pub allocations: Vec<AllocationCost>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostDistribution {
    /// Roster order.
    pub members: Vec<MemberCost>,
    pub total: f64,
}

pub fn member_cost(member: &TeamMember, weeks: u32, working_days_per_week: f64) -> MemberCost {
    let allocations: Vec<AllocationCost> = member
        .allocations
        .iter()
        .map(|allocation| {
            let hours = allocation.weekly_hours(working_days_per_week).max(0.0) * f64::from(weeks);
            let rate = allocation.rate.max(0.0);
            AllocationCost {
                role: allocation.role.clone(),
                hours,
                rate,
                cost: hours * rate,
            }
        })
        .collect();
    let total = allocations.iter().map(|a| a.cost).sum();
    MemberCost {
        member_id: member.id.clone(),
        member_name: member.name.clone(),
        allocations,
        total,
    }
}

pub fn distribute_costs(
    members: &[TeamMember],
    weeks: u32,
    working_days_per_week: f64,
) -> CostDistribution {
    let members: Vec<MemberCost> = members
        .iter()
        .map(|member| member_cost(member, weeks, working_days_per_week))
        .collect();
    let total = members.iter().map(|m| m.total).sum();
    CostDistribution { members, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimate_core::project::Allocation;

    #[test]
    fn members_with_the_same_name_stay_separate() {
        let members = [
            TeamMember::new("Sam", "Editor").with_allocation(Allocation::new("Editor", 2.0, 100.0)),
            TeamMember::new("Sam", "Editor").with_allocation(Allocation::new("Editor", 2.0, 50.0)),
        ];
        let distribution = distribute_costs(&members, 3, 5.0);
        assert_eq!(distribution.members.len(), 2);
        assert_eq!(distribution.members[0].total, 2.0 * 5.0 * 3.0 * 100.0);
        assert_eq!(distribution.members[1].total, 2.0 * 5.0 * 3.0 * 50.0);
        assert_ne!(distribution.members[0].member_id, distribution.members[1].member_id);
        assert_eq!(distribution.total, 3000.0 + 1500.0);
    }

    #[test]
    fn zero_weeks_costs_nothing() {
        let members = [TeamMember::new("Idle", "Editor")
            .with_allocation(Allocation::new("Editor", 5.0, 120.0))];
        let distribution = distribute_costs(&members, 0, 5.0);
        assert_eq!(distribution.total, 0.0);
        assert_eq!(distribution.members[0].allocations[0].hours, 0.0);
    }
}
