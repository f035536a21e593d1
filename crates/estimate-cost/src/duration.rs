//! Bottleneck Duration Resolver.
//!
//! The project takes as many whole weeks as its slowest staffed role needs.
//! Roles with demand but no capacity cannot finish at all; they are left out of
//! the maximum and reported in `unstaffed_roles` instead.

use crate::demand::RoleHours;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleLoad {
    pub role: String,
    pub demand: f64,
    pub weekly_capacity: f64,
    /// Whole weeks this role needs on its own.
    pub weeks: u32,
    /// Unrounded `demand / weekly_capacity`.
    pub load_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DurationResolution {
    pub weeks: u32,
    pub roles: Vec<RoleLoad>,
    pub bottleneck_role: Option<String>,
    pub unstaffed_roles: Vec<String>,
}

impl DurationResolution {
    pub fn load_for(&self, role: &str) -> Option<&RoleLoad> {
        self.roles.iter().find(|load| load.role == role)
    }
}

fn whole_weeks(ratio: f64) -> u32 {
    let weeks = ratio.ceil();
    if weeks >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        weeks as u32
    }
}

/// Roles are visited in name order, so on equal load ratios the first name wins.
pub fn resolve_duration(demand: &RoleHours, capacity: &RoleHours) -> DurationResolution {
    let mut resolution = DurationResolution::default();
    let mut worst_ratio = 0.0_f64;

    for (role, &hours) in demand {
        if hours <= 0.0 {
            continue;
        }
        let weekly_capacity = capacity.get(role).copied().unwrap_or(0.0);
        if weekly_capacity <= 0.0 {
            tracing::warn!(
                role = %role,
                demand = hours,
                "role has demand but no staffed capacity; excluded from duration"
            );
            resolution.unstaffed_roles.push(role.clone());
            continue;
        }

        let load_ratio = hours / weekly_capacity;
        let weeks = whole_weeks(load_ratio);
        if load_ratio > worst_ratio {
            worst_ratio = load_ratio;
            resolution.bottleneck_role = Some(role.clone());
        }
        resolution.weeks = resolution.weeks.max(weeks);
        resolution.roles.push(RoleLoad {
            role: role.clone(),
            demand: hours,
            weekly_capacity,
            weeks,
            load_ratio,
        });
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(entries: &[(&str, f64)]) -> RoleHours {
        entries.iter().map(|(r, h)| (r.to_string(), *h)).collect()
    }

    #[test]
    fn duration_is_the_slowest_role() {
        let demand = hours(&[("Editor", 10.0), ("Researcher", 15.0)]);
        let capacity = hours(&[("Editor", 15.0), ("Researcher", 10.0)]);
        let resolution = resolve_duration(&demand, &capacity);
        assert_eq!(resolution.weeks, 2);
        assert_eq!(resolution.bottleneck_role.as_deref(), Some("Researcher"));
        assert_eq!(resolution.load_for("Editor").unwrap().weeks, 1);
    }

    #[test]
    fn partial_weeks_round_up() {
        let demand = hours(&[("Editor", 25.1)]);
        let capacity = hours(&[("Editor", 25.0)]);
        assert_eq!(resolve_duration(&demand, &capacity).weeks, 2);

        let demand = hours(&[("Editor", 25.0)]);
        assert_eq!(resolve_duration(&demand, &capacity).weeks, 1);
    }

    #[test]
    fn bottleneck_uses_unrounded_ratio_and_first_wins_ties() {
        // both need 2 whole weeks, but Researcher is further along its second week
        let demand = hours(&[("Editor", 11.0), ("Researcher", 19.0)]);
        let capacity = hours(&[("Editor", 10.0), ("Researcher", 10.0)]);
        let resolution = resolve_duration(&demand, &capacity);
        assert_eq!(resolution.bottleneck_role.as_deref(), Some("Researcher"));

        let demand = hours(&[("Editor", 10.0), ("Researcher", 10.0)]);
        let resolution = resolve_duration(&demand, &capacity);
        assert_eq!(resolution.bottleneck_role.as_deref(), Some("Editor"));
    }

    #[test]
    fn unstaffed_roles_are_reported_not_counted() {
        let demand = hours(&[("Editor", 10.0), ("Specialist Reviewer", 5.0)]);
        let capacity = hours(&[("Editor", 25.0)]);
        let resolution = resolve_duration(&demand, &capacity);
        assert_eq!(resolution.weeks, 1);
        assert_eq!(resolution.unstaffed_roles, vec!["Specialist Reviewer".to_string()]);
        assert!(resolution.load_for("Specialist Reviewer").is_none());
    }

    #[test]
    fn no_demand_means_no_duration() {
        let demand = hours(&[("Editor", 0.0)]);
        let capacity = hours(&[("Editor", 25.0)]);
        let resolution = resolve_duration(&demand, &capacity);
        assert_eq!(resolution.weeks, 0);
        assert!(resolution.bottleneck_role.is_none());
        assert!(resolution.roles.is_empty());
    }
}
