pub mod problem;
pub mod user;

use crate::modules::errors::CatalogError;
use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cf_catalog_libs::{CodeforcesClient, FetchError};
use serde::Serialize;
use sqlx::{postgres::Postgres, Pool};
use std::sync::Arc;
use validator::Validate;

pub struct AppState {
    pub pool: Pool<Postgres>,
    pub source: CodeforcesClient,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::ExternalFetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
            CatalogError::ExternalFetch(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Conflict(_) => StatusCode::CONFLICT,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Forbidden => StatusCode::FORBIDDEN,
            CatalogError::Database(e) => {
                tracing::error!("database failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self))).into_response()
    }
}

pub(crate) fn validate_payload<T: Validate>(payload: &T) -> Result<(), CatalogError> {
    payload
        .validate()
        .map_err(|rejection| CatalogError::Validation(rejection.to_string().replace('\n', ", ")))
}

/// Identity supplied by the authentication collaborator via the `x-user-id`
/// header. The core trusts it as-is and never authenticates.
pub struct CurrentUser(pub i64);

/// Same identity, but optional: anonymous callers may read.
pub struct MaybeUser(pub Option<i64>);

fn user_id_header(parts: &Parts) -> Result<Option<i64>, (StatusCode, Json<ErrorResponse>)> {
    match parts.headers.get("x-user-id") {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Some)
            .ok_or((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("malformed x-user-id header")),
            )),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_header(parts)?.map(CurrentUser).ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("x-user-id header is required")),
        ))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_id_header(parts)?))
    }
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(Extension(state): Extension<Arc<AppState>>) -> StatusCode {
    match sqlx::query("SELECT 1;").execute(&state.pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!("readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
