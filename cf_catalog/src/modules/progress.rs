use crate::modules::errors::{CatalogError, Result};
use serde::Serialize;
use sqlx::{postgres::Postgres, Pool};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Solved,
}

impl Status {
    pub fn parse(input: &str) -> Result<Self> {
        match input {
            "pending" => Ok(Status::Pending),
            "solved" => Ok(Status::Solved),
            other => Err(CatalogError::Validation(format!(
                "invalid status [{}]: expected pending or solved",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Solved => "solved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user-per-problem progress markers, independent of rating values.
pub struct ProgressTracker<'a> {
    pool: &'a Pool<Postgres>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(pool: &'a Pool<Postgres>) -> Self {
        ProgressTracker { pool }
    }

    /// Adds the problem to the user's collection with no status yet.
    /// Returns whether a new record was created, so callers can distinguish
    /// "added" from "already in collection".
    pub async fn attach(&self, user_id: i64, problem_pk: i64) -> Result<bool> {
        let created = sqlx::query(
            r#"
            INSERT INTO user_problems (user_id, problem_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, problem_id) DO NOTHING;
            "#,
        )
        .bind(user_id)
        .bind(problem_pk)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(created > 0)
    }

    /// Creates the collection entry if absent, then sets its status.
    pub async fn mark(&self, user_id: i64, problem_pk: i64, status: Status) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_problems (user_id, problem_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, problem_id) DO UPDATE SET status = EXCLUDED.status;
            "#,
        )
        .bind(user_id)
        .bind(problem_pk)
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        tracing::info!("user {} marked problem {} as {}", user_id, problem_pk, status);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_accepts_known_statuses() {
        assert_eq!(Status::parse("pending").unwrap(), Status::Pending);
        assert_eq!(Status::parse("solved").unwrap(), Status::Solved);
    }

    #[test]
    fn parse_rejects_unknown_status() {
        assert!(matches!(
            Status::parse("done"),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(Status::parse(""), Err(CatalogError::Validation(_))));
        // No implicit case folding; the caller sends the literal token.
        assert!(Status::parse("Solved").is_err());
    }
}
