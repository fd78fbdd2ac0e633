use cf_catalog_libs::FetchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed input from the caller. Surfaced as-is, never a system fault.
    #[error("{0}")]
    Validation(String),
    /// Upstream unavailable, malformed response, or entity not found there.
    #[error("codeforces fetch failed: {0}")]
    ExternalFetch(#[from] FetchError),
    /// Uniqueness violation in the store.
    #[error("{0}")]
    Conflict(String),
    /// Locally stored entity missing.
    #[error("{0} not found")]
    NotFound(String),
    #[error("permission denied")]
    Forbidden,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            CatalogError::Conflict(format!("duplicate record: {}", e))
        } else {
            CatalogError::Database(e)
        }
    }
}

// Postgres SQLSTATE 23505, unique_violation.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
