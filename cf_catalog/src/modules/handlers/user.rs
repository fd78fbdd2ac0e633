use crate::modules::{
    errors::{CatalogError, Result},
    handlers::{validate_payload, AppState, CurrentUser},
    profiles::{ProfileService, ProfileUpdate},
    query::{CatalogQuery, ProblemView},
    ranking::{ContributionRanker, LeaderboardEntry},
};
use crate::types::tables::{Profile, User};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub profile: Profile,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(max = 100))]
    pub codeforces_handle: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub profile: Profile,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    pub user: User,
    pub profile: Profile,
    pub problems: Vec<ProblemView>,
}

pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    validate_payload(&payload)?;

    let (user, profile) = ProfileService::new(&state.pool, &state.source)
        .register(payload.username.trim())
        .await
        .map_err(|e| match e {
            CatalogError::Conflict(_) => {
                CatalogError::Conflict(format!("username {} is already taken", payload.username))
            }
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, profile })))
}

pub async fn leaderboard(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let profiles = ProfileService::new(&state.pool, &state.source);
    let entries = ContributionRanker::new(&state.pool)
        .leaderboard(&profiles)
        .await?;

    Ok(Json(entries))
}

pub async fn get_user(
    Path(username): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<UserDetailResponse>> {
    let profiles = ProfileService::new(&state.pool, &state.source);
    let user = profiles
        .find_user(&username)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("user {}", username)))?;
    let profile = profiles.ensure_profile(user.id).await?;

    // The listed problems carry the profile owner's own ratings and statuses.
    let problems = CatalogQuery::new(&state.pool)
        .problems_for_user(user.id, Some(user.id))
        .await?;

    Ok(Json(UserDetailResponse {
        user,
        profile,
        problems,
    }))
}

pub async fn update_profile(
    CurrentUser(user_id): CurrentUser,
    Path(username): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileUpdateResponse>> {
    validate_payload(&payload)?;

    let profiles = ProfileService::new(&state.pool, &state.source);
    let user = profiles
        .find_user(&username)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("user {}", username)))?;
    if user.id != user_id {
        return Err(CatalogError::Forbidden);
    }

    let saved = profiles
        .update_profile(
            user.id,
            ProfileUpdate {
                codeforces_handle: payload.codeforces_handle,
                bio: payload.bio,
                avatar_url: payload.avatar_url,
            },
        )
        .await?;

    Ok(Json(ProfileUpdateResponse {
        profile: saved.profile,
        warning: saved.fetch_warning,
    }))
}
