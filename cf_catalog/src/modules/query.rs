use crate::{
    modules::errors::Result,
    types::tables::{Problem, Rating, UserProblem},
};
use serde::Serialize;
use sqlx::{
    postgres::{PgRow, Postgres},
    Pool, Row,
};
use std::collections::HashMap;

const PROBLEM_COLUMNS: &str = "id, problem_id, name, contest_id, problem_index, \
     average_rating, codeforces_rating, codeforces_rating_estimated, owner_id";

/// A problem with its tags and, when a viewer is known, that viewer's own
/// rating value and progress status.
#[derive(Debug, Serialize)]
pub struct ProblemView {
    #[serde(flatten)]
    pub problem: Problem,
    pub tags: Vec<String>,
    pub user_rating: Option<i16>,
    pub user_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<ProblemView>,
    pub id_not_found: bool,
}

/// Read side of the catalog: ordered problem lists enriched per viewer.
pub struct CatalogQuery<'a> {
    pool: &'a Pool<Postgres>,
}

impl<'a> CatalogQuery<'a> {
    pub fn new(pool: &'a Pool<Postgres>) -> Self {
        CatalogQuery { pool }
    }

    /// All problems, best-rated first.
    pub async fn list_problems(&self, viewer: Option<i64>) -> Result<Vec<ProblemView>> {
        let problems: Vec<Problem> = sqlx::query_as(&format!(
            "SELECT {} FROM problems ORDER BY average_rating DESC, problem_id ASC;",
            PROBLEM_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        self.enrich(problems, viewer).await
    }

    /// Problems the user has added to their collection or rated.
    pub async fn problems_for_user(
        &self,
        user_id: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<ProblemView>> {
        let problems: Vec<Problem> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM problems
            WHERE id IN (
                SELECT problem_id FROM user_problems WHERE user_id = $1
                UNION
                SELECT problem_id FROM ratings WHERE user_id = $1
            )
            ORDER BY average_rating DESC, problem_id ASC;
            "#,
            PROBLEM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.enrich(problems, viewer).await
    }

    /// An identifier takes priority over a tag filter; an empty tag means all
    /// problems. Simple filters only.
    pub async fn search(
        &self,
        problem_id: Option<&str>,
        tag: Option<&str>,
        viewer: Option<i64>,
    ) -> Result<SearchOutcome> {
        if let Some(identifier) = problem_id.map(str::trim).filter(|s| !s.is_empty()) {
            let problem: Option<Problem> = sqlx::query_as(&format!(
                "SELECT {} FROM problems WHERE upper(problem_id) = upper($1);",
                PROBLEM_COLUMNS
            ))
            .bind(identifier)
            .fetch_optional(self.pool)
            .await?;

            return match problem {
                Some(problem) => Ok(SearchOutcome {
                    results: self.enrich(vec![problem], viewer).await?,
                    id_not_found: false,
                }),
                None => Ok(SearchOutcome {
                    results: Vec::new(),
                    id_not_found: true,
                }),
            };
        }

        let problems: Vec<Problem> = match tag.filter(|t| !t.is_empty()) {
            Some(tag) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {} FROM problems
                    WHERE id IN (
                        SELECT pt.problem_id FROM problem_tags pt
                        JOIN tags t ON t.id = pt.tag_id
                        WHERE lower(t.name) = lower($1)
                    )
                    ORDER BY average_rating DESC, problem_id ASC;
                    "#,
                    PROBLEM_COLUMNS
                ))
                .bind(tag)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM problems ORDER BY average_rating DESC, problem_id ASC;",
                    PROBLEM_COLUMNS
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(SearchOutcome {
            results: self.enrich(problems, viewer).await?,
            id_not_found: false,
        })
    }

    pub async fn tag_names(&self) -> Result<Vec<String>> {
        let tags = sqlx::query("SELECT name FROM tags ORDER BY name;")
            .map(|row: PgRow| row.get(0))
            .fetch_all(self.pool)
            .await?;

        Ok(tags)
    }

    async fn enrich(
        &self,
        problems: Vec<Problem>,
        viewer: Option<i64>,
    ) -> Result<Vec<ProblemView>> {
        let (rating_map, status_map) = match viewer {
            Some(user_id) => (
                self.viewer_ratings(user_id).await?,
                self.viewer_statuses(user_id).await?,
            ),
            None => (HashMap::new(), HashMap::new()),
        };

        let mut views = Vec::with_capacity(problems.len());
        for problem in problems {
            let tags: Vec<String> = sqlx::query(
                r#"
                SELECT t.name FROM tags t
                JOIN problem_tags pt ON pt.tag_id = t.id
                WHERE pt.problem_id = $1
                ORDER BY t.name;
                "#,
            )
            .bind(problem.id)
            .map(|row: PgRow| row.get(0))
            .fetch_all(self.pool)
            .await?;

            views.push(ProblemView {
                user_rating: rating_map.get(&problem.id).copied(),
                user_status: status_map.get(&problem.id).cloned(),
                problem,
                tags,
            });
        }

        Ok(views)
    }

    async fn viewer_ratings(&self, user_id: i64) -> Result<HashMap<i64, i16>> {
        let rows: Vec<Rating> =
            sqlx::query_as("SELECT user_id, problem_id, value FROM ratings WHERE user_id = $1;")
                .bind(user_id)
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|rating| (rating.problem_id, rating.value))
            .collect())
    }

    async fn viewer_statuses(&self, user_id: i64) -> Result<HashMap<i64, String>> {
        let rows: Vec<UserProblem> = sqlx::query_as(
            "SELECT user_id, problem_id, status, added_at FROM user_problems WHERE user_id = $1;",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|entry| entry.status.map(|status| (entry.problem_id, status)))
            .collect())
    }
}
