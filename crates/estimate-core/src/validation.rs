use crate::project::{Philosophy, ProjectData, TeamMember};
use crate::roles::DAILY_HOURS_LIMIT;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The estimate is probably wrong or misleading.
    Warning,
    /// Worth a look, but the estimate is still sound.
    Notice,
}

/// Advisory finding. Nothing here blocks a calculation or a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            subject: subject.into(),
            message: message.into(),
        }
    }

    fn notice(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Notice,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Notice => "notice",
        };
        write!(f, "[{level}] {}: {}", self.subject, self.message)
    }
}

fn invalid_quantity(value: f64) -> bool {
    !value.is_finite() || value < -EPSILON
}

fn validate_member(
    member: &TeamMember,
    project: &ProjectData,
    philosophy: &Philosophy,
    issues: &mut Vec<ValidationIssue>,
) {
    let subject = format!("member '{}'", member.name);
    let mut roles = HashSet::with_capacity(member.allocations.len());

    for allocation in &member.allocations {
        if allocation.role.trim().is_empty() {
            issues.push(ValidationIssue::warning(
                &subject,
                "allocation has an empty role name",
            ));
            continue;
        }
        if !roles.insert(allocation.role.as_str()) {
            issues.push(ValidationIssue::warning(
                &subject,
                format!("role '{}' is allocated more than once", allocation.role),
            ));
        }
        if invalid_quantity(allocation.hours_per_day) {
            issues.push(ValidationIssue::warning(
                &subject,
                format!(
                    "allocation for '{}' has invalid hours_per_day {}",
                    allocation.role, allocation.hours_per_day
                ),
            ));
        } else if allocation.hours_per_day > DAILY_HOURS_LIMIT + EPSILON {
            issues.push(ValidationIssue::notice(
                &subject,
                format!(
                    "allocation for '{}' is {}h/day, above the {}h sustainable limit",
                    allocation.role, allocation.hours_per_day, DAILY_HOURS_LIMIT
                ),
            ));
        }
        if invalid_quantity(allocation.rate) {
            issues.push(ValidationIssue::warning(
                &subject,
                format!(
                    "allocation for '{}' has invalid rate {}",
                    allocation.role, allocation.rate
                ),
            ));
        }
        if !project.roles.knows(&allocation.role) {
            issues.push(ValidationIssue::notice(
                &subject,
                format!(
                    "role '{}' is not in the rate table and receives no demand",
                    allocation.role
                ),
            ));
        }
    }

    let daily = member.total_hours_per_day();
    if daily > f64::from(philosophy.hours_per_day()) + EPSILON {
        issues.push(ValidationIssue::notice(
            &subject,
            format!(
                "commits {daily}h/day, more than the {}h/day pace",
                philosophy.hours_per_day()
            ),
        ));
    }
}

fn check_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(ValidationIssue::warning(
                format!("{kind} '{id}'"),
                format!("duplicate {kind} id"),
            ));
        }
    }
}

pub fn validate_project(project: &ProjectData) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    check_unique(
        "member",
        project.team_members.iter().map(|m| m.id.as_str()),
        &mut issues,
    );
    for member in &project.team_members {
        validate_member(member, project, &project.philosophy, &mut issues);
    }

    check_unique(
        "chapter",
        project.chapters.iter().map(|c| c.id.as_str()),
        &mut issues,
    );
    check_unique(
        "section",
        project
            .chapters
            .iter()
            .flat_map(|c| c.sections.iter().map(|s| s.id.as_str())),
        &mut issues,
    );
    check_unique(
        "subsection",
        project.subsections().map(|s| s.id.as_str()),
        &mut issues,
    );

    for sub in project.subsections() {
        for (field, value) in [
            ("editor_hours", sub.editor_hours),
            ("researcher_hours", sub.researcher_hours),
            ("review_hours", sub.review_hours),
        ] {
            if invalid_quantity(value) {
                issues.push(ValidationIssue::warning(
                    format!("subsection '{}'", sub.name),
                    format!("invalid {field} {value}"),
                ));
            }
        }
    }

    for (category, cost) in project.fixed_costs.iter() {
        if invalid_quantity(cost.amount) {
            issues.push(ValidationIssue::warning(
                format!("{category} cost '{}'", cost.name),
                format!("invalid amount {}", cost.amount),
            ));
        }
    }

    issues
}
