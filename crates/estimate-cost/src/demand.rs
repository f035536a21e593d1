//! Work Demand Aggregator: turns the work tree into hours per role.

use estimate_core::project::{Chapter, Complexity, Subsection};
use estimate_core::roles;
use serde::Serialize;
use std::collections::BTreeMap;

/// Hours keyed by role name.
pub type RoleHours = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortField {
    Editor,
    Researcher,
    Review,
}

impl EffortField {
    pub const ALL: [EffortField; 3] = [Self::Editor, Self::Researcher, Self::Review];

    pub fn hours(self, subsection: &Subsection) -> f64 {
        let hours = match self {
            Self::Editor => subsection.editor_hours,
            Self::Researcher => subsection.researcher_hours,
            Self::Review => subsection.review_hours,
        };
        hours.max(0.0)
    }
}

/// Routes `share` of one effort field to `role`, optionally only for one complexity tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandRule {
    pub field: EffortField,
    pub tier: Option<Complexity>,
    pub role: String,
    pub share: f64,
}

impl DemandRule {
    pub fn new(field: EffortField, role: impl Into<String>) -> Self {
        Self {
            field,
            tier: None,
            role: role.into(),
            share: 1.0,
        }
    }

    pub fn for_tier(mut self, tier: Complexity) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_share(mut self, share: f64) -> Self {
        self.share = share;
        self
    }

    fn applies_to(&self, field: EffortField, subsection: &Subsection) -> bool {
        self.field == field && self.tier.is_none_or(|tier| tier == subsection.complexity)
    }
}

/// Inspectable table deciding which role absorbs which effort hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandMapping {
    rules: Vec<DemandRule>,
}

impl Default for DemandMapping {
    fn default() -> Self {
        Self::standard()
    }
}

impl DemandMapping {
    pub fn new(rules: Vec<DemandRule>) -> Self {
        Self { rules }
    }

    /// One field, one role, whole hours. Complexity plays no part.
    pub fn standard() -> Self {
        Self::new(vec![
            DemandRule::new(EffortField::Editor, roles::EDITOR),
            DemandRule::new(EffortField::Researcher, roles::RESEARCHER),
            DemandRule::new(EffortField::Review, roles::SPECIALIST_REVIEWER),
        ])
    }

    /// The older tier-sensitive split of review hours, with the role names of that era.
    pub fn tiered_review() -> Self {
        Self::new(vec![
            DemandRule::new(EffortField::Editor, "Lead Editor"),
            DemandRule::new(EffortField::Researcher, roles::RESEARCHER),
            DemandRule::new(EffortField::Review, "Topic Specialist")
                .for_tier(Complexity::Complex)
                .with_share(0.6),
            DemandRule::new(EffortField::Review, "Reviewer")
                .for_tier(Complexity::Complex)
                .with_share(0.4),
            DemandRule::new(EffortField::Review, "Research Assistant")
                .for_tier(Complexity::Moderate)
                .with_share(0.5),
            DemandRule::new(EffortField::Review, "Reviewer")
                .for_tier(Complexity::Moderate)
                .with_share(0.5),
            DemandRule::new(EffortField::Review, "Research Assistant").for_tier(Complexity::Simple),
        ])
    }

    pub fn rules(&self) -> &[DemandRule] {
        &self.rules
    }

    /// Every role the mapping can route hours to, in first-mention order.
    pub fn roles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.role.as_str()) {
                names.push(&rule.role);
            }
        }
        names
    }

    pub fn route(&self, subsection: &Subsection, demand: &mut RoleHours) {
        for field in EffortField::ALL {
            let hours = field.hours(subsection);
            for rule in self.rules.iter().filter(|r| r.applies_to(field, subsection)) {
                *demand.entry(rule.role.clone()).or_insert(0.0) += hours * rule.share;
            }
        }
    }
}

/// Demand per role. Every role named by `mapping` is present, at zero when there is no work.
pub fn aggregate_demand(chapters: &[Chapter], mapping: &DemandMapping) -> RoleHours {
    let mut demand: RoleHours = mapping
        .roles()
        .into_iter()
        .map(|role| (role.to_string(), 0.0))
        .collect();
    for subsection in chapters.iter().flat_map(Chapter::subsections) {
        mapping.route(subsection, &mut demand);
    }
    demand
}
