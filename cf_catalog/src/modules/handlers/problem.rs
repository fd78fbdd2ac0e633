use crate::modules::{
    catalog::{AddOutcome, ProblemCatalog},
    errors::{CatalogError, Result},
    handlers::{AppState, CurrentUser, MaybeUser},
    ledger::RatingLedger,
    progress::{ProgressTracker, Status},
    query::{CatalogQuery, ProblemView, SearchOutcome},
};
use crate::types::tables::Problem;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use cf_catalog_libs::ProblemId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AddProblemRequest {
    pub problem_id: String,
}

#[derive(Debug, Serialize)]
pub struct AddProblemResponse {
    pub outcome: &'static str,
    pub problem: Problem,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub value: i32,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub average_rating: f64,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParameter {
    pub problem_id: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    pub tags: Vec<String>,
}

pub async fn list_problems(
    MaybeUser(viewer): MaybeUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ProblemView>>> {
    let problems = CatalogQuery::new(&state.pool).list_problems(viewer).await?;
    Ok(Json(problems))
}

pub async fn add_problem(
    CurrentUser(user_id): CurrentUser,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AddProblemRequest>,
) -> Result<(StatusCode, Json<AddProblemResponse>)> {
    let catalog = ProblemCatalog::new(&state.pool, &state.source);
    let outcome = catalog.add_or_attach(&payload.problem_id, user_id).await?;

    let (status, label) = match &outcome {
        AddOutcome::Created(_) => (StatusCode::CREATED, "created"),
        AddOutcome::Attached(_) => (StatusCode::OK, "attached"),
        AddOutcome::AlreadyInCollection(_) => (StatusCode::OK, "already_in_collection"),
    };

    Ok((
        status,
        Json(AddProblemResponse {
            outcome: label,
            problem: outcome.problem().clone(),
        }),
    ))
}

pub async fn get_problem(
    Path(problem_id): Path<String>,
    MaybeUser(viewer): MaybeUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ProblemView>> {
    let problem = find_problem(&state, &problem_id).await?;
    let outcome = CatalogQuery::new(&state.pool)
        .search(Some(&problem.problem_id), None, viewer)
        .await?;

    outcome
        .results
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| CatalogError::NotFound(format!("problem {}", problem_id)))
}

pub async fn rate_problem(
    CurrentUser(user_id): CurrentUser,
    Path(problem_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<RateResponse>> {
    let problem = find_problem(&state, &problem_id).await?;
    let average_rating = RatingLedger::new(&state.pool)
        .rate(user_id, problem.id, payload.value)
        .await?;

    Ok(Json(RateResponse { average_rating }))
}

pub async fn remove_rating(
    CurrentUser(user_id): CurrentUser,
    Path(problem_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RateResponse>> {
    let problem = find_problem(&state, &problem_id).await?;
    let average_rating = RatingLedger::new(&state.pool)
        .remove(user_id, problem.id)
        .await?;

    Ok(Json(RateResponse { average_rating }))
}

pub async fn mark_problem(
    CurrentUser(user_id): CurrentUser,
    Path(problem_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<MarkRequest>,
) -> Result<StatusCode> {
    let status = Status::parse(&payload.status)?;
    let problem = find_problem(&state, &problem_id).await?;
    ProgressTracker::new(&state.pool)
        .mark(user_id, problem.id, status)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(
    Query(params): Query<SearchParameter>,
    MaybeUser(viewer): MaybeUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<SearchResponse>> {
    let query = CatalogQuery::new(&state.pool);
    let outcome = query
        .search(params.problem_id.as_deref(), params.tag.as_deref(), viewer)
        .await?;
    let tags = query.tag_names().await?;

    Ok(Json(SearchResponse { outcome, tags }))
}

async fn find_problem(state: &AppState, identifier: &str) -> Result<Problem> {
    let id = ProblemId::parse(identifier).map_err(|e| CatalogError::Validation(e.to_string()))?;
    ProblemCatalog::new(&state.pool, &state.source)
        .find_by_problem_id(&id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("problem {}", id)))
}
