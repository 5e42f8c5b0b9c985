use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    ids::RecordId,
    state::AppState,
    validation::Validated,
};

use super::dto::{CreateExperienceRequest, GetExperienceRequest, ListExperiencesRequest};
use super::listing::{ListFilter, ListQuery, Page};
use super::repo_types::{Experience, ExperienceView};

pub fn experience_routes() -> Router<AppState> {
    Router::new()
        .route("/experiences", get(list_experiences).post(create_experience))
        .route("/experiences/:id", get(get_experience))
}

/// The author is always the authenticated caller; nothing in the body can
/// override it. A valid token for a user the store no longer knows is a 401.
#[instrument(skip(state, req))]
pub async fn create_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Validated(req): Validated<CreateExperienceRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Experience>), AppError> {
    if state.users.find_by_id(&user_id).await?.is_none() {
        warn!(%user_id, "token for unknown user");
        return Err(AppError::Unauthorized("User not found".into()));
    }

    let experience = req.body.into_experience(user_id);
    state.experiences.insert(&experience).await?;
    info!(id = %experience.id, author_id = %experience.author_id, "experience created");

    let location = format!("/experiences/{}", experience.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(experience),
    ))
}

#[instrument(skip(state, req))]
pub async fn list_experiences(
    State(state): State<AppState>,
    Validated(req): Validated<ListExperiencesRequest>,
) -> Result<Json<Page<ExperienceView>>, AppError> {
    let q = req.query;
    let query = ListQuery::from_raw(
        ListFilter::new(q.company, q.role),
        q.page.as_deref(),
        q.limit.as_deref(),
        q.sort,
    );
    let page = state.experiences.list(&query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, req))]
pub async fn get_experience(
    State(state): State<AppState>,
    Validated(req): Validated<GetExperienceRequest>,
) -> Result<Json<ExperienceView>, AppError> {
    let id = RecordId::parse(&req.params.id).map_err(|e| AppError::Validation(e.to_string()))?;
    state
        .experiences
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found".into()))
}
