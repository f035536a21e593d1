use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use estimate_core::{
    Allocation, Chapter, FixedCost, FixedCostCategory, Philosophy, PersistenceError,
    PhilosophyUpdate, ProjectData, ProjectIntent, ProjectSession, RoleRates, Subsection,
    SubsectionUpdate, TeamMember, TeamMemberUpdate, ValidationIssue, export_chapters_to_csv,
    import_chapters_from_csv, restore_project, validate_project, write_csv_template,
};
use estimate_cost::{CostModel, ProjectEstimate, estimate_with_model};

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<ProjectSession>>,
}

impl AppState {
    pub fn new(session: ProjectSession) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }

    pub fn with_shared(session: Arc<RwLock<ProjectSession>>) -> Self {
        Self { session }
    }

    fn project(&self) -> Arc<ProjectData> {
        self.session.read().project()
    }

    async fn apply(&self, intent: ProjectIntent) -> Result<Arc<ProjectData>, ApiError> {
        self.apply_if(intent, |_| Ok(())).await
    }

    /// Runs `check` and then `intent` under one write guard, on the blocking pool.
    async fn apply_if<F>(
        &self,
        intent: ProjectIntent,
        check: F,
    ) -> Result<Arc<ProjectData>, ApiError>
    where
        F: FnOnce(&ProjectData) -> Result<(), ApiError> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = session.write();
            let current = guard.project();
            check(current.as_ref())?;
            guard.apply(intent).map_err(ApiError::from)
        })
        .await
        .map_err(|err| ApiError::internal(format!("project update task failed: {err}")))?
    }
}

fn member_exists(
    member_id: String,
) -> impl FnOnce(&ProjectData) -> Result<(), ApiError> + Send + 'static {
    move |project| {
        if project.team_members.iter().any(|m| m.id == member_id) {
            Ok(())
        } else {
            Err(ApiError::not_found(format!("member {member_id} not found")))
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        tracing::error!(error = %value, "failed to persist project");
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct RenamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RatePayload {
    rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMemberPayload {
    name: String,
    #[serde(default)]
    primary_role: String,
    #[serde(default)]
    allocations: Vec<Allocation>,
}

#[derive(Debug, Deserialize)]
struct NewChapterPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct NewFixedCostPayload {
    name: String,
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
struct EstimateQuery {
    model: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/project", get(get_project).put(replace_project))
        .route("/project/name", put(rename_project))
        .route("/project/reset", post(reset_project))
        .route("/philosophy", get(get_philosophy).put(update_philosophy))
        .route("/roles", get(get_roles))
        .route("/roles/:role", put(set_custom_rate).delete(remove_custom_rate))
        .route("/members", get(list_members).post(create_member))
        .route("/members/preset", post(load_preset_team))
        .route("/members/:id", put(update_member).delete(delete_member))
        .route("/chapters", get(list_chapters).post(create_chapter))
        .route("/chapters/import", post(import_chapters))
        .route("/chapters/export", get(export_chapters))
        .route("/chapters/template", get(chapter_template))
        .route(
            "/chapters/:chapter_id/sections/:section_id/subsections/:subsection_id",
            put(update_subsection),
        )
        .route("/fixed-costs/:category", post(create_fixed_cost))
        .route("/fixed-costs/:category/:id", delete(delete_fixed_cost))
        .route("/estimate", get(get_estimate))
        .route("/validation", get(get_validation))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, session: ProjectSession) -> std::io::Result<()> {
    let state = AppState::new(session);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_project(State(state): State<AppState>) -> Json<ProjectData> {
    Json(state.project().as_ref().clone())
}

/// Accepts any snapshot shape a store could hold, migrating it before it becomes current.
async fn replace_project(
    State(state): State<AppState>,
    Json(snapshot): Json<Value>,
) -> Result<Json<ProjectData>, ApiError> {
    let project = restore_project(snapshot).map_err(|err| ApiError::invalid(err.to_string()))?;
    let current = state.apply(ProjectIntent::Load(project)).await?;
    Ok(Json(current.as_ref().clone()))
}

async fn rename_project(
    State(state): State<AppState>,
    Json(payload): Json<RenamePayload>,
) -> Result<Json<ProjectData>, ApiError> {
    let current = state.apply(ProjectIntent::Rename(payload.name)).await?;
    Ok(Json(current.as_ref().clone()))
}

async fn reset_project(State(state): State<AppState>) -> Result<Json<ProjectData>, ApiError> {
    let current = state.apply(ProjectIntent::Reset).await?;
    Ok(Json(current.as_ref().clone()))
}

async fn get_philosophy(State(state): State<AppState>) -> Json<Philosophy> {
    Json(state.project().philosophy)
}

async fn update_philosophy(
    State(state): State<AppState>,
    Json(update): Json<PhilosophyUpdate>,
) -> Result<Json<Philosophy>, ApiError> {
    let current = state.apply(ProjectIntent::UpdatePhilosophy(update)).await?;
    Ok(Json(current.philosophy))
}

async fn get_roles(State(state): State<AppState>) -> Json<RoleRates> {
    Json(state.project().roles.clone())
}

async fn set_custom_rate(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Json(payload): Json<RatePayload>,
) -> Result<Json<RoleRates>, ApiError> {
    if !payload.rate.is_finite() || payload.rate < 0.0 {
        return Err(ApiError::invalid("rate must be a non-negative number"));
    }
    let checked = role.clone();
    let intent = ProjectIntent::SetCustomRate {
        role,
        rate: payload.rate,
    };
    let current = state
        .apply_if(intent, move |project| {
            if project.roles.is_preset(&checked) {
                return Err(ApiError::Conflict(format!(
                    "role '{checked}' is a preset role with a fixed rate"
                )));
            }
            Ok(())
        })
        .await?;
    Ok(Json(current.roles.clone()))
}

async fn remove_custom_rate(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<StatusCode, ApiError> {
    let checked = role.clone();
    state
        .apply_if(ProjectIntent::RemoveCustomRate { role }, move |project| {
            if project.roles.custom.contains_key(&checked) {
                Ok(())
            } else {
                Err(ApiError::not_found(format!("custom role '{checked}' not found")))
            }
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(State(state): State<AppState>) -> Json<Vec<TeamMember>> {
    Json(state.project().team_members.clone())
}

async fn create_member(
    State(state): State<AppState>,
    Json(payload): Json<NewMemberPayload>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::invalid("member name must not be empty"));
    }
    let mut member = TeamMember::new(payload.name, payload.primary_role);
    for allocation in payload.allocations {
        member.upsert_allocation(allocation);
    }
    let id = member.id.clone();
    let current = state.apply(ProjectIntent::AddTeamMember(member)).await?;
    let created = current
        .find_member(&id)
        .cloned()
        .ok_or_else(|| ApiError::internal("member not found after creation"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Json(update): Json<TeamMemberUpdate>,
) -> Result<Json<TeamMember>, ApiError> {
    let intent = ProjectIntent::UpdateTeamMember {
        id: member_id.clone(),
        update,
    };
    let current = state
        .apply_if(intent, member_exists(member_id.clone()))
        .await?;
    let updated = current
        .team_members
        .iter()
        .find(|m| m.id == member_id)
        .cloned()
        .ok_or_else(|| ApiError::internal("member not found after update"))?;
    Ok(Json(updated))
}

async fn delete_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let check = member_exists(member_id.clone());
    state
        .apply_if(ProjectIntent::RemoveTeamMember { id: member_id }, check)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_preset_team(
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamMember>>, ApiError> {
    let current = state.apply(ProjectIntent::LoadPresetTeam).await?;
    Ok(Json(current.team_members.clone()))
}

async fn list_chapters(State(state): State<AppState>) -> Json<Vec<Chapter>> {
    Json(state.project().chapters.clone())
}

async fn create_chapter(
    State(state): State<AppState>,
    Json(payload): Json<NewChapterPayload>,
) -> Result<(StatusCode, Json<Chapter>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::invalid("chapter name must not be empty"));
    }
    let chapter = Chapter::new(payload.name);
    state.apply(ProjectIntent::AddChapter(chapter.clone())).await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// Replaces the whole work tree with the chapters parsed from a CSV body.
async fn import_chapters(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    let chapters = import_chapters_from_csv(body.as_bytes())
        .map_err(|err| ApiError::invalid(err.to_string()))?;
    let current = state.apply(ProjectIntent::ImportChapters(chapters)).await?;
    Ok(Json(current.chapters.clone()))
}

fn csv_response(bytes: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        bytes,
    )
        .into_response()
}

async fn export_chapters(State(state): State<AppState>) -> Result<Response, ApiError> {
    let project = state.project();
    let mut buffer = Vec::new();
    export_chapters_to_csv(&project.chapters, &mut buffer)?;
    Ok(csv_response(buffer))
}

async fn chapter_template() -> Result<Response, ApiError> {
    let mut buffer = Vec::new();
    write_csv_template(&mut buffer)?;
    Ok(csv_response(buffer))
}

async fn update_subsection(
    State(state): State<AppState>,
    Path((chapter_id, section_id, subsection_id)): Path<(String, String, String)>,
    Json(update): Json<SubsectionUpdate>,
) -> Result<Json<Subsection>, ApiError> {
    let ids = (chapter_id.clone(), section_id.clone(), subsection_id.clone());
    let check = move |project: &ProjectData| {
        let (chapter_id, section_id, subsection_id) = ids;
        let located = project
            .locate_subsection(&subsection_id)
            .is_some_and(|(c, s)| c == chapter_id && s == section_id);
        if located {
            Ok(())
        } else {
            Err(ApiError::not_found(format!(
                "subsection {subsection_id} not found under chapter {chapter_id} section {section_id}"
            )))
        }
    };
    let intent = ProjectIntent::UpdateSubsection {
        chapter_id,
        section_id,
        subsection_id: subsection_id.clone(),
        update,
    };
    let current = state.apply_if(intent, check).await?;
    let updated = current
        .subsections()
        .find(|sub| sub.id == subsection_id)
        .cloned()
        .ok_or_else(|| ApiError::internal("subsection not found after update"))?;
    Ok(Json(updated))
}

fn parse_category(raw: &str) -> Result<FixedCostCategory, ApiError> {
    FixedCostCategory::from_str(raw).map_err(|err| ApiError::invalid(err.to_string()))
}

async fn create_fixed_cost(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(payload): Json<NewFixedCostPayload>,
) -> Result<(StatusCode, Json<FixedCost>), ApiError> {
    let category = parse_category(&category)?;
    if !payload.amount.is_finite() || payload.amount < 0.0 {
        return Err(ApiError::invalid("amount must be a non-negative number"));
    }
    let cost = FixedCost::new(payload.name, payload.amount);
    state
        .apply(ProjectIntent::AddFixedCost {
            category,
            cost: cost.clone(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(cost)))
}

async fn delete_fixed_cost(
    State(state): State<AppState>,
    Path((category, cost_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let category = parse_category(&category)?;
    let checked = cost_id.clone();
    let check = move |project: &ProjectData| {
        if project
            .fixed_costs
            .category(category)
            .iter()
            .any(|c| c.id == checked)
        {
            Ok(())
        } else {
            Err(ApiError::not_found(format!(
                "{category} cost {checked} not found"
            )))
        }
    };
    state
        .apply_if(
            ProjectIntent::RemoveFixedCost {
                category,
                id: cost_id,
            },
            check,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_estimate(
    State(state): State<AppState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<ProjectEstimate>, ApiError> {
    let model = match query.model.as_deref() {
        None | Some("standard") => CostModel::default(),
        Some("tiered") => CostModel::tiered_review(),
        Some(other) => {
            return Err(ApiError::invalid(format!(
                "unknown model '{other}' (expected standard or tiered)"
            )));
        }
    };
    Ok(Json(estimate_with_model(&state.project(), &model)))
}

async fn get_validation(State(state): State<AppState>) -> Json<Vec<ValidationIssue>> {
    Json(validate_project(&state.project()))
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}
