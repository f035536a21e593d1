//! Explicit owner of the current project.
//!
//! Every change is expressed as a [`ProjectIntent`] and applied by
//! [`apply_intent`], which returns a whole new aggregate rather than editing in
//! place. [`ProjectSession`] swaps the shared snapshot and writes it through to
//! the attached store after each change.

use crate::migration::normalize_loaded;
use crate::persistence::{PersistenceResult, ProjectStore};
use crate::project::{
    Allocation, Chapter, Complexity, FixedCost, FixedCostCategory, Philosophy, ProjectData,
    TeamMember, new_id, preset_team,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Partial philosophy change. A missing or zero factor keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhilosophyUpdate {
    pub hours_per_day: Option<u32>,
    pub days_per_week: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMemberUpdate {
    pub name: Option<String>,
    pub primary_role: Option<String>,
    pub allocations: Option<Vec<Allocation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubsectionUpdate {
    pub name: Option<String>,
    pub complexity: Option<Complexity>,
    pub editor_hours: Option<f64>,
    pub researcher_hours: Option<f64>,
    pub review_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectIntent {
    Rename(String),
    UpdatePhilosophy(PhilosophyUpdate),
    SetCustomRate { role: String, rate: f64 },
    RemoveCustomRate { role: String },
    AddTeamMember(TeamMember),
    UpdateTeamMember { id: String, update: TeamMemberUpdate },
    RemoveTeamMember { id: String },
    /// Replaces the whole roster with [`preset_team`].
    LoadPresetTeam,
    AddChapter(Chapter),
    UpdateSubsection {
        chapter_id: String,
        section_id: String,
        subsection_id: String,
        update: SubsectionUpdate,
    },
    /// Replaces the whole work tree.
    ImportChapters(Vec<Chapter>),
    AddFixedCost { category: FixedCostCategory, cost: FixedCost },
    RemoveFixedCost { category: FixedCostCategory, id: String },
    Reset,
    Load(ProjectData),
}

impl ProjectIntent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rename(_) => "rename",
            Self::UpdatePhilosophy(_) => "update_philosophy",
            Self::SetCustomRate { .. } => "set_custom_rate",
            Self::RemoveCustomRate { .. } => "remove_custom_rate",
            Self::AddTeamMember(_) => "add_team_member",
            Self::UpdateTeamMember { .. } => "update_team_member",
            Self::RemoveTeamMember { .. } => "remove_team_member",
            Self::LoadPresetTeam => "load_preset_team",
            Self::AddChapter(_) => "add_chapter",
            Self::UpdateSubsection { .. } => "update_subsection",
            Self::ImportChapters(_) => "import_chapters",
            Self::AddFixedCost { .. } => "add_fixed_cost",
            Self::RemoveFixedCost { .. } => "remove_fixed_cost",
            Self::Reset => "reset",
            Self::Load(_) => "load",
        }
    }
}

fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

fn apply_member_update(member: &mut TeamMember, update: TeamMemberUpdate) {
    if let Some(name) = update.name {
        member.name = name;
    }
    if let Some(primary_role) = update.primary_role {
        member.primary_role = primary_role;
    }
    if let Some(allocations) = update.allocations {
        member.allocations.clear();
        for mut allocation in allocations {
            allocation.hours_per_day = allocation.hours_per_day.max(0.0);
            allocation.rate = allocation.rate.max(0.0);
            member.upsert_allocation(allocation);
        }
    }
}

fn apply_subsection_update(project: &mut ProjectData, ids: [&str; 3], update: SubsectionUpdate) -> bool {
    let [chapter_id, section_id, subsection_id] = ids;
    let Some(sub) = project
        .chapters
        .iter_mut()
        .filter(|c| c.id == chapter_id)
        .flat_map(|c| c.sections.iter_mut())
        .filter(|s| s.id == section_id)
        .flat_map(|s| s.subsections.iter_mut())
        .find(|sub| sub.id == subsection_id)
    else {
        return false;
    };

    if let Some(name) = update.name {
        sub.name = name;
    }
    if let Some(complexity) = update.complexity {
        sub.complexity = complexity;
    }
    if let Some(hours) = update.editor_hours {
        sub.editor_hours = hours.max(0.0);
    }
    if let Some(hours) = update.researcher_hours {
        sub.researcher_hours = hours.max(0.0);
    }
    if let Some(hours) = update.review_hours {
        sub.review_hours = hours.max(0.0);
    }
    true
}

/// Produces the aggregate that results from `intent`, stamping `updated_at = now`.
/// Intents that name an unknown id leave everything else unchanged.
pub fn apply_intent(project: &ProjectData, intent: ProjectIntent, now: DateTime<Utc>) -> ProjectData {
    let mut next = project.clone();
    let mut matched = true;

    match intent {
        ProjectIntent::Rename(name) => next.name = name,
        ProjectIntent::UpdatePhilosophy(update) => {
            let current = next.philosophy;
            next.philosophy = Philosophy::new(
                non_zero(update.hours_per_day).unwrap_or(current.hours_per_day()),
                non_zero(update.days_per_week).unwrap_or(current.days_per_week()),
            );
        }
        ProjectIntent::SetCustomRate { role, rate } => {
            matched = next.roles.set_custom_rate(role, rate);
        }
        ProjectIntent::RemoveCustomRate { role } => {
            matched = next.roles.remove_custom_rate(&role);
        }
        ProjectIntent::AddTeamMember(mut member) => {
            if member.id.trim().is_empty() {
                member.id = new_id();
            }
            next.team_members.push(member);
        }
        ProjectIntent::UpdateTeamMember { id, update } => {
            match next.team_members.iter_mut().find(|m| m.id == id) {
                Some(member) => apply_member_update(member, update),
                None => matched = false,
            }
        }
        ProjectIntent::RemoveTeamMember { id } => {
            let before = next.team_members.len();
            next.team_members.retain(|m| m.id != id);
            matched = next.team_members.len() != before;
        }
        ProjectIntent::LoadPresetTeam => next.team_members = preset_team(),
        ProjectIntent::AddChapter(mut chapter) => {
            if chapter.id.trim().is_empty() {
                chapter.id = new_id();
            }
            next.chapters.push(chapter);
        }
        ProjectIntent::UpdateSubsection {
            chapter_id,
            section_id,
            subsection_id,
            update,
        } => {
            matched = apply_subsection_update(
                &mut next,
                [&chapter_id, &section_id, &subsection_id],
                update,
            );
        }
        ProjectIntent::ImportChapters(chapters) => next.chapters = chapters,
        ProjectIntent::AddFixedCost { category, mut cost } => {
            if cost.id.trim().is_empty() {
                cost.id = new_id();
            }
            cost.amount = cost.amount.max(0.0);
            next.fixed_costs.category_mut(category).push(cost);
        }
        ProjectIntent::RemoveFixedCost { category, id } => {
            let list = next.fixed_costs.category_mut(category);
            let before = list.len();
            list.retain(|c| c.id != id);
            matched = list.len() != before;
        }
        ProjectIntent::Reset => {
            next = ProjectData::default();
            next.created_at = now;
        }
        ProjectIntent::Load(mut data) => {
            normalize_loaded(&mut data);
            next = data;
        }
    }

    if !matched {
        tracing::debug!("intent matched nothing; only the timestamp changes");
    }
    next.updated_at = now;
    next
}

/// Holds the current project snapshot and, optionally, the store it is written to.
pub struct ProjectSession {
    project: Arc<ProjectData>,
    store: Option<Arc<dyn ProjectStore>>,
}

impl Default for ProjectSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectSession {
    pub fn new() -> Self {
        Self::with_project(ProjectData::default())
    }

    pub fn with_project(project: ProjectData) -> Self {
        Self {
            project: Arc::new(project),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Loads the stored project, migrating it if needed, or starts a new one.
    pub fn open(store: Arc<dyn ProjectStore>) -> PersistenceResult<Self> {
        let project = match store.load_project()? {
            Some(project) => {
                tracing::info!(project = %project.name, "restored stored project");
                project
            }
            None => {
                tracing::info!("no stored project; starting a new one");
                ProjectData::default()
            }
        };
        Ok(Self::with_project(project).with_store(store))
    }

    pub fn project(&self) -> Arc<ProjectData> {
        Arc::clone(&self.project)
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Applies `intent` and writes the result through to the store. If the write
    /// fails the previous snapshot stays current.
    pub fn apply(&mut self, intent: ProjectIntent) -> PersistenceResult<Arc<ProjectData>> {
        let name = intent.name();
        let next = apply_intent(&self.project, intent, Utc::now());
        if let Some(store) = &self.store {
            store.save_project(&next)?;
        }
        tracing::debug!(intent = name, "applied project intent");
        self.project = Arc::new(next);
        Ok(self.project())
    }
}
