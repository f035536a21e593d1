use crate::roles::{self, RoleRates};
use crate::serde_helpers::{
    lenient_string, lenient_timestamp, lenient_u32, non_negative_f64, null_as_default,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Name of the container that holds subsections with no natural section.
pub const MAIN_TOPICS: &str = "Main Topics";

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sustainable-pace settings. `hours_per_week` is always derived from the two factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PhilosophyRecord", rename_all = "camelCase")]
pub struct Philosophy {
    hours_per_day: u32,
    days_per_week: u32,
    hours_per_week: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhilosophyRecord {
    #[serde(default, deserialize_with = "lenient_u32")]
    hours_per_day: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    days_per_week: u32,
}

impl From<PhilosophyRecord> for Philosophy {
    fn from(record: PhilosophyRecord) -> Self {
        let defaults = Philosophy::default();
        let hours = if record.hours_per_day == 0 {
            defaults.hours_per_day
        } else {
            record.hours_per_day
        };
        let days = if record.days_per_week == 0 {
            defaults.days_per_week
        } else {
            record.days_per_week
        };
        Philosophy::new(hours, days)
    }
}

impl Default for Philosophy {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

impl Philosophy {
    pub const HOURS_PER_DAY_RANGE: (u32, u32) = (1, 8);
    pub const DAYS_PER_WEEK_RANGE: (u32, u32) = (1, 7);

    /// Builds a philosophy, clamping both factors into their allowed ranges.
    pub fn new(hours_per_day: u32, days_per_week: u32) -> Self {
        let (min_h, max_h) = Self::HOURS_PER_DAY_RANGE;
        let (min_d, max_d) = Self::DAYS_PER_WEEK_RANGE;
        let hours_per_day = hours_per_day.clamp(min_h, max_h);
        let days_per_week = days_per_week.clamp(min_d, max_d);
        Self {
            hours_per_day,
            days_per_week,
            hours_per_week: hours_per_day * days_per_week,
        }
    }

    pub fn hours_per_day(&self) -> u32 {
        self.hours_per_day
    }

    pub fn days_per_week(&self) -> u32 {
        self.days_per_week
    }

    pub fn hours_per_week(&self) -> u32 {
        self.hours_per_week
    }

    pub fn with_hours_per_day(self, hours_per_day: u32) -> Self {
        Self::new(hours_per_day, self.days_per_week)
    }

    pub fn with_days_per_week(self, days_per_week: u32) -> Self {
        Self::new(self.hours_per_day, days_per_week)
    }
}

/// A staff member's commitment of daily hours to one role at one rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub hours_per_day: f64,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub rate: f64,
}

impl Allocation {
    pub fn new(role: impl Into<String>, hours_per_day: f64, rate: f64) -> Self {
        Self {
            role: role.into(),
            hours_per_day,
            rate,
        }
    }

    pub fn weekly_hours(&self, working_days_per_week: f64) -> f64 {
        self.hours_per_day * working_days_per_week
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Informational only; capacity comes from `allocations`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub primary_role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocations: Vec<Allocation>,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, primary_role: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            primary_role: primary_role.into(),
            allocations: Vec::new(),
        }
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.upsert_allocation(allocation);
        self
    }

    /// Replaces the allocation for the same role, or appends a new one.
    pub fn upsert_allocation(&mut self, allocation: Allocation) {
        match self
            .allocations
            .iter_mut()
            .find(|existing| existing.role == allocation.role)
        {
            Some(existing) => *existing = allocation,
            None => self.allocations.push(allocation),
        }
    }

    pub fn remove_allocation(&mut self, role: &str) -> bool {
        let before = self.allocations.len();
        self.allocations.retain(|a| a.role != role);
        self.allocations.len() != before
    }

    pub fn allocation_for(&self, role: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.role == role)
    }

    pub fn total_hours_per_day(&self) -> f64 {
        self.allocations.iter().map(|a| a.hours_per_day).sum()
    }

    pub fn total_hours_per_week(&self, working_days_per_week: f64) -> f64 {
        self.total_hours_per_day() * working_days_per_week
    }

    /// What one week of this member's committed time costs.
    pub fn weekly_cost(&self, working_days_per_week: f64) -> f64 {
        self.allocations
            .iter()
            .map(|a| a.weekly_hours(working_days_per_week) * a.rate)
            .sum()
    }
}

/// Starter roster covering each preset role once.
pub fn preset_team() -> Vec<TeamMember> {
    vec![
        TeamMember::new("Alex Morgan", roles::EDITOR).with_allocation(Allocation::new(
            roles::EDITOR,
            5.0,
            roles::CANONICAL_RATE,
        )),
        TeamMember::new("Jordan Lee", roles::RESEARCHER).with_allocation(Allocation::new(
            roles::RESEARCHER,
            5.0,
            roles::CANONICAL_RATE,
        )),
        TeamMember::new("Sam Taylor", roles::SPECIALIST_REVIEWER)
            .with_allocation(Allocation::new(
                roles::SPECIALIST_REVIEWER,
                4.0,
                roles::CANONICAL_RATE,
            ))
            .with_allocation(Allocation::new(
                roles::RESEARCHER,
                1.0,
                roles::CANONICAL_RATE,
            )),
    ]
}

/// Complexity tier of a work-item. Informational: it does not change the standard formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Complexity {
    Simple = 1,
    #[default]
    Moderate = 2,
    Complex = 3,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Self::Simple, Self::Moderate, Self::Complex];

    pub fn from_tier(tier: i64) -> Option<Self> {
        match tier {
            1 => Some(Self::Simple),
            2 => Some(Self::Moderate),
            3 => Some(Self::Complex),
            _ => None,
        }
    }

    pub fn tier(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tier())
    }
}

impl Serialize for Complexity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.tier())
    }
}

impl<'de> Deserialize<'de> for Complexity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(crate::serde_helpers::number_from_value(&value)
            .filter(|n| n.fract() == 0.0)
            .and_then(|n| Complexity::from_tier(n as i64))
            .unwrap_or_default())
    }
}

/// Leaf unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub editor_hours: f64,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub researcher_hours: f64,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub review_hours: f64,
}

impl Subsection {
    pub fn new(
        name: impl Into<String>,
        complexity: Complexity,
        editor_hours: f64,
        researcher_hours: f64,
        review_hours: f64,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            complexity,
            editor_hours,
            researcher_hours,
            review_hours,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.editor_hours + self.researcher_hours + self.review_hours
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subsections: Vec<Subsection>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            subsections: Vec::new(),
        }
    }

    pub fn main_topics() -> Self {
        Self::new(MAIN_TOPICS)
    }

    pub fn with_subsection(mut self, subsection: Subsection) -> Self {
        self.subsections.push(subsection);
        self
    }

    /// True for containers that exist only to hold work placed directly under a chapter:
    /// the `Main Topics` bucket, or a section wrapping a single subsection of the same name.
    pub fn is_synthetic(&self) -> bool {
        if self.name == MAIN_TOPICS {
            return true;
        }
        matches!(self.subsections.as_slice(), [only] if only.name == self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
}

impl Chapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn subsections(&self) -> impl Iterator<Item = &Subsection> {
        self.sections.iter().flat_map(|s| s.subsections.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCost {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "non_negative_f64")]
    pub amount: f64,
}

impl FixedCost {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedCostCategory {
    Software,
    Workshop,
    Consultants,
    Other,
}

impl FixedCostCategory {
    pub const ALL: [FixedCostCategory; 4] = [
        Self::Software,
        Self::Workshop,
        Self::Consultants,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Workshop => "workshop",
            Self::Consultants => "consultants",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FixedCostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixedCostCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "software" => Ok(Self::Software),
            "workshop" => Ok(Self::Workshop),
            "consultants" => Ok(Self::Consultants),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown fixed cost category '{other}'")),
        }
    }
}

/// Flat, non-labor costs in their four categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCosts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub software: Vec<FixedCost>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub workshop: Vec<FixedCost>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consultants: Vec<FixedCost>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub other: Vec<FixedCost>,
}

impl FixedCosts {
    pub fn category(&self, category: FixedCostCategory) -> &[FixedCost] {
        match category {
            FixedCostCategory::Software => &self.software,
            FixedCostCategory::Workshop => &self.workshop,
            FixedCostCategory::Consultants => &self.consultants,
            FixedCostCategory::Other => &self.other,
        }
    }

    pub fn category_mut(&mut self, category: FixedCostCategory) -> &mut Vec<FixedCost> {
        match category {
            FixedCostCategory::Software => &mut self.software,
            FixedCostCategory::Workshop => &mut self.workshop,
            FixedCostCategory::Consultants => &mut self.consultants,
            FixedCostCategory::Other => &mut self.other,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FixedCostCategory, &FixedCost)> {
        FixedCostCategory::ALL
            .into_iter()
            .flat_map(move |category| self.category(category).iter().map(move |c| (category, c)))
    }
}

/// Aggregate root: the unit of persistence and of migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub philosophy: Philosophy,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: RoleRates,
    #[serde(default, deserialize_with = "null_as_default")]
    pub team_members: Vec<TeamMember>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chapters: Vec<Chapter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixed_costs: FixedCosts,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self::new("New Project")
    }
}

impl ProjectData {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            philosophy: Philosophy::default(),
            roles: RoleRates::canonical(),
            team_members: Vec::new(),
            chapters: Vec::new(),
            fixed_costs: FixedCosts::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subsections(&self) -> impl Iterator<Item = &Subsection> {
        self.chapters.iter().flat_map(Chapter::subsections)
    }

    /// Returns `(chapter_id, section_id)` for the subsection with the given id.
    pub fn locate_subsection(&self, subsection_id: &str) -> Option<(&str, &str)> {
        self.chapters.iter().find_map(|chapter| {
            chapter.sections.iter().find_map(|section| {
                section
                    .subsections
                    .iter()
                    .any(|sub| sub.id == subsection_id)
                    .then(|| (chapter.id.as_str(), section.id.as_str()))
            })
        })
    }

    /// Looks a member up by id, falling back to an exact name match.
    pub fn find_member(&self, id_or_name: &str) -> Option<&TeamMember> {
        self.team_members
            .iter()
            .find(|m| m.id == id_or_name)
            .or_else(|| self.team_members.iter().find(|m| m.name == id_or_name))
    }
}
