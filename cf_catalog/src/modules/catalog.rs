use crate::{
    modules::{
        errors::{CatalogError, Result},
        progress::ProgressTracker,
    },
    types::tables::Problem,
};
use cf_catalog_libs::{MetadataSource, ProblemId};
use serde::Serialize;
use sqlx::{
    postgres::{PgRow, Postgres},
    Pool, Row,
};
use tokio::time::{self, Duration};

/// Owns problem entities: enrichment from the external source on first add,
/// and the batch rating-refresh job.
pub struct ProblemCatalog<'a, S: MetadataSource> {
    pool: &'a Pool<Postgres>,
    source: &'a S,
}

#[derive(Debug)]
pub enum AddOutcome {
    /// First successful enrichment; the problem row is new.
    Created(Problem),
    /// The problem already existed locally and was added to the collection.
    Attached(Problem),
    /// The problem was already in the requester's collection.
    AlreadyInCollection(Problem),
}

impl AddOutcome {
    pub fn problem(&self) -> &Problem {
        match self {
            AddOutcome::Created(problem)
            | AddOutcome::Attached(problem)
            | AddOutcome::AlreadyInCollection(problem) => problem,
        }
    }
}

const PROBLEM_COLUMNS: &str = "id, problem_id, name, contest_id, problem_index, \
     average_rating, codeforces_rating, codeforces_rating_estimated, owner_id";

impl<'a, S: MetadataSource> ProblemCatalog<'a, S> {
    pub fn new(pool: &'a Pool<Postgres>, source: &'a S) -> Self {
        ProblemCatalog { pool, source }
    }

    /// Adds a problem by its external identifier on behalf of a user.
    ///
    /// An already-known identifier attaches the existing row to the user's
    /// collection without touching the external source. An unknown one is
    /// fetched, persisted with its tags and owner, and attached, all in one
    /// transaction; nothing is persisted when the fetch fails.
    pub async fn add_or_attach(&self, identifier: &str, requesting_user: i64) -> Result<AddOutcome> {
        let id =
            ProblemId::parse(identifier).map_err(|e| CatalogError::Validation(e.to_string()))?;

        if let Some(problem) = self.find_by_problem_id(&id).await? {
            return self.attach_existing(problem, requesting_user).await;
        }

        let fetched = self.source.fetch_problem(&id).await?;

        let mut tx = self.pool.begin().await?;
        let inserted: Option<Problem> = sqlx::query_as(&format!(
            r#"
            INSERT INTO problems (problem_id, name, contest_id, problem_index, codeforces_rating, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (problem_id) DO NOTHING
            RETURNING {};
            "#,
            PROBLEM_COLUMNS
        ))
        .bind(id.to_string())
        .bind(&fetched.name)
        .bind(id.contest_id())
        .bind(id.index())
        .bind(fetched.rating)
        .bind(requesting_user)
        .fetch_optional(&mut tx)
        .await?;

        let problem = match inserted {
            Some(problem) => problem,
            None => {
                // Lost a creation race; fall back to attaching the winner's row.
                tx.rollback().await?;
                let problem = self.find_by_problem_id(&id).await?.ok_or_else(|| {
                    CatalogError::Conflict(format!("problem {} exists but cannot be read", id))
                })?;
                return self.attach_existing(problem, requesting_user).await;
            }
        };

        for tag in fetched.tags.iter() {
            let tag_id: i64 = sqlx::query(
                r#"
                INSERT INTO tags (name)
                VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id;
                "#,
            )
            .bind(tag)
            .map(|row: PgRow| row.get(0))
            .fetch_one(&mut tx)
            .await?;

            sqlx::query(
                "INSERT INTO problem_tags (problem_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
            )
            .bind(problem.id)
            .bind(tag_id)
            .execute(&mut tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO user_problems (user_id, problem_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
        )
        .bind(requesting_user)
        .bind(problem.id)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            "problem {} created by user {} with {} tags",
            problem.problem_id,
            requesting_user,
            fetched.tags.len()
        );

        Ok(AddOutcome::Created(problem))
    }

    pub async fn find_by_problem_id(&self, id: &ProblemId) -> Result<Option<Problem>> {
        let problem = sqlx::query_as(&format!(
            "SELECT {} FROM problems WHERE problem_id = $1;",
            PROBLEM_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(problem)
    }

    async fn attach_existing(&self, problem: Problem, user_id: i64) -> Result<AddOutcome> {
        let created = ProgressTracker::new(self.pool)
            .attach(user_id, problem.id)
            .await?;
        Ok(if created {
            AddOutcome::Attached(problem)
        } else {
            AddOutcome::AlreadyInCollection(problem)
        })
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub delay: Duration,
    pub dry_run: bool,
    pub estimate_missing: bool,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub checked: u32,
    pub updated: u32,
    pub already_current: u32,
    pub missing: u32,
    pub estimated: u32,
    pub failed: u32,
}

#[derive(Debug, PartialEq, Eq)]
enum RefreshPlan {
    /// The external source reports a rating that differs from the stored one
    /// (or the stored one was estimated).
    Update { value: i32 },
    AlreadyCurrent,
    /// No external rating; derive one from the local average user rating.
    Estimate { value: i32 },
    SkipMissing,
}

/// Linear map of the 0-10 user scale onto the ~800-3500 Codeforces scale.
fn estimate_from_average(average_rating: f64) -> i32 {
    (800.0 + average_rating * 270.0).round() as i32
}

fn plan_refresh(
    stored: Option<i32>,
    stored_estimated: bool,
    average_rating: f64,
    fetched: Option<i32>,
    estimate_missing: bool,
) -> RefreshPlan {
    match fetched {
        Some(value) => {
            if stored != Some(value) || stored_estimated {
                RefreshPlan::Update { value }
            } else {
                RefreshPlan::AlreadyCurrent
            }
        }
        None => {
            if estimate_missing && average_rating > 0.0 {
                let value = estimate_from_average(average_rating);
                if stored != Some(value) || !stored_estimated {
                    return RefreshPlan::Estimate { value };
                }
            }
            RefreshPlan::SkipMissing
        }
    }
}

/// Batch job that walks every stored problem and reconciles its difficulty
/// rating with the external source, one independently committed step per
/// problem, sleeping between external calls.
pub struct RatingRefresher<'a, S: MetadataSource> {
    pool: &'a Pool<Postgres>,
    source: &'a S,
    options: RefreshOptions,
}

impl<'a, S: MetadataSource> RatingRefresher<'a, S> {
    pub fn new(pool: &'a Pool<Postgres>, source: &'a S, options: RefreshOptions) -> Self {
        RatingRefresher {
            pool,
            source,
            options,
        }
    }

    pub async fn run(&self) -> Result<RefreshSummary> {
        let problems: Vec<Problem> = sqlx::query_as(&format!(
            "SELECT {} FROM problems ORDER BY problem_id;",
            PROBLEM_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        tracing::info!("checking {} problems", problems.len());
        let mut summary = RefreshSummary::default();

        for (i, problem) in problems.iter().enumerate() {
            if i > 0 {
                time::sleep(self.options.delay).await;
            }
            summary.checked += 1;

            match self.refresh_one(problem).await {
                Ok(RefreshPlan::Update { .. }) => summary.updated += 1,
                Ok(RefreshPlan::AlreadyCurrent) => summary.already_current += 1,
                Ok(RefreshPlan::Estimate { .. }) => {
                    summary.missing += 1;
                    summary.estimated += 1;
                }
                Ok(RefreshPlan::SkipMissing) => summary.missing += 1,
                Err(e) => {
                    tracing::warn!("failed to refresh {}: {}", problem.problem_id, e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!("refresh finished: {:?}", summary);
        Ok(summary)
    }

    async fn refresh_one(&self, problem: &Problem) -> Result<RefreshPlan> {
        let id = ProblemId::parse(&problem.problem_id)
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        let fetched = self.source.fetch_problem(&id).await?;

        let plan = plan_refresh(
            problem.codeforces_rating,
            problem.codeforces_rating_estimated,
            problem.average_rating,
            fetched.rating,
            self.options.estimate_missing,
        );

        match plan {
            RefreshPlan::Update { value } => {
                tracing::info!(
                    "updating {}: {:?} -> {}",
                    problem.problem_id,
                    problem.codeforces_rating,
                    value
                );
                if !self.options.dry_run {
                    self.store_rating(problem.id, value, false).await?;
                }
            }
            RefreshPlan::Estimate { value } => {
                tracing::info!(
                    "estimating {}: {:?} -> {} (from average {})",
                    problem.problem_id,
                    problem.codeforces_rating,
                    value,
                    problem.average_rating
                );
                if !self.options.dry_run {
                    self.store_rating(problem.id, value, true).await?;
                }
            }
            RefreshPlan::AlreadyCurrent | RefreshPlan::SkipMissing => {}
        }

        Ok(plan)
    }

    // A single statement, so each problem's update commits independently and
    // the batch can be interrupted between iterations without corruption.
    async fn store_rating(&self, problem_pk: i64, value: i32, estimated: bool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE problems
            SET codeforces_rating = $1, codeforces_rating_estimated = $2
            WHERE id = $3;
            "#,
        )
        .bind(value)
        .bind(estimated)
        .bind(problem_pk)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn estimate_maps_user_scale_onto_cf_scale() {
        assert_eq!(estimate_from_average(5.0), 2150);
        assert_eq!(estimate_from_average(10.0), 3500);
        assert_eq!(estimate_from_average(0.1), 827);
    }

    #[test]
    fn plan_estimates_when_source_has_no_rating() {
        let plan = plan_refresh(None, false, 5.0, None, true);
        assert_eq!(plan, RefreshPlan::Estimate { value: 2150 });
    }

    #[test]
    fn plan_overwrites_estimate_once_source_reports_a_rating() {
        let plan = plan_refresh(Some(2150), true, 5.0, Some(1900), true);
        assert_eq!(plan, RefreshPlan::Update { value: 1900 });
    }

    #[test]
    fn plan_rewrites_even_an_equal_value_when_it_was_estimated() {
        // The stored value happens to match but must lose its estimated flag.
        let plan = plan_refresh(Some(1900), true, 5.0, Some(1900), false);
        assert_eq!(plan, RefreshPlan::Update { value: 1900 });
    }

    #[test]
    fn plan_leaves_matching_sourced_rating_alone() {
        let plan = plan_refresh(Some(1900), false, 5.0, Some(1900), true);
        assert_eq!(plan, RefreshPlan::AlreadyCurrent);
    }

    #[test]
    fn plan_skips_when_estimation_is_off_or_impossible() {
        assert_eq!(plan_refresh(None, false, 5.0, None, false), RefreshPlan::SkipMissing);
        // No user ratings yet, nothing to estimate from.
        assert_eq!(plan_refresh(None, false, 0.0, None, true), RefreshPlan::SkipMissing);
    }

    #[test]
    fn plan_does_not_rewrite_an_unchanged_estimate() {
        let plan = plan_refresh(Some(2150), true, 5.0, None, true);
        assert_eq!(plan, RefreshPlan::SkipMissing);
    }
}
