use crate::{
    modules::errors::{CatalogError, Result},
    types::tables::Rating,
};
use sqlx::{postgres::Postgres, Pool, Transaction};

/// Per-user-per-problem rating records, with the owning problem's average
/// re-established inside the same transaction as every mutation.
pub struct RatingLedger<'a> {
    pool: &'a Pool<Postgres>,
}

/// Arithmetic mean rounded to 2 decimals with ties to even, 0.0 for an empty
/// set.
///
/// Values are summed as integers before the single division, so the result is
/// free of accumulation bias.
pub fn mean_rating(values: &[i16]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: i64 = values.iter().map(|value| i64::from(*value)).sum();
    let mean = sum as f64 / values.len() as f64;
    (mean * 100.0).round_ties_even() / 100.0
}

/// Checks a submitted rating is an integer in `0..=10`, narrowing it to the
/// column type.
pub fn validate_rating_value(value: i32) -> Result<i16> {
    if (0..=10).contains(&value) {
        Ok(value as i16)
    } else {
        Err(CatalogError::Validation(format!(
            "rating value must be an integer between 0 and 10, got {}",
            value
        )))
    }
}

impl<'a> RatingLedger<'a> {
    pub fn new(pool: &'a Pool<Postgres>) -> Self {
        RatingLedger { pool }
    }

    /// Creates or updates the (user, problem) rating, then recomputes the
    /// problem's average. Both writes commit atomically; a failed recompute
    /// fails the whole mutation.
    pub async fn rate(&self, user_id: i64, problem_pk: i64, value: i32) -> Result<f64> {
        let value = validate_rating_value(value)?;

        let mut tx = self.pool.begin().await?;
        Self::lock_problem(&mut tx, problem_pk).await?;
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, problem_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, problem_id) DO UPDATE SET value = EXCLUDED.value;
            "#,
        )
        .bind(user_id)
        .bind(problem_pk)
        .bind(value)
        .execute(&mut tx)
        .await?;

        let average = Self::recompute_average(&mut tx, problem_pk).await?;
        tx.commit().await?;

        tracing::info!(
            "user {} rated problem {} as {}, new average {}",
            user_id,
            problem_pk,
            value,
            average
        );
        Ok(average)
    }

    /// Deletes the rating if present (no-op otherwise) and recomputes the
    /// average either way.
    pub async fn remove(&self, user_id: i64, problem_pk: i64) -> Result<f64> {
        let mut tx = self.pool.begin().await?;
        Self::lock_problem(&mut tx, problem_pk).await?;
        let deleted = sqlx::query("DELETE FROM ratings WHERE user_id = $1 AND problem_id = $2;")
            .bind(user_id)
            .bind(problem_pk)
            .execute(&mut tx)
            .await?
            .rows_affected();

        let average = Self::recompute_average(&mut tx, problem_pk).await?;
        tx.commit().await?;

        if deleted > 0 {
            tracing::info!(
                "user {} removed their rating of problem {}, new average {}",
                user_id,
                problem_pk,
                average
            );
        }
        Ok(average)
    }

    /// Takes a row lock on the problem before any rating read or write.
    /// Concurrent mutations on the same problem serialize here, so each
    /// recompute sees every previously committed rating row.
    async fn lock_problem(tx: &mut Transaction<'_, Postgres>, problem_pk: i64) -> Result<()> {
        sqlx::query("SELECT id FROM problems WHERE id = $1 FOR UPDATE;")
            .bind(problem_pk)
            .execute(&mut *tx)
            .await?;

        Ok(())
    }

    async fn recompute_average(
        tx: &mut Transaction<'_, Postgres>,
        problem_pk: i64,
    ) -> Result<f64> {
        let ratings: Vec<Rating> =
            sqlx::query_as("SELECT user_id, problem_id, value FROM ratings WHERE problem_id = $1;")
                .bind(problem_pk)
                .fetch_all(&mut *tx)
                .await?;

        let values: Vec<i16> = ratings.iter().map(|rating| rating.value).collect();
        let average = mean_rating(&values);
        sqlx::query("UPDATE problems SET average_rating = $1 WHERE id = $2;")
            .bind(average)
            .bind(problem_pk)
            .execute(&mut *tx)
            .await?;

        Ok(average)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sqlx::{
        postgres::{PgPoolOptions, PgRow},
        Row,
    };

    #[test]
    fn mean_of_empty_set_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn mean_rounds_to_two_decimals() {
        assert_eq!(mean_rating(&[5]), 5.0);
        assert_eq!(mean_rating(&[0, 10]), 5.0);
        // 10/3 = 3.333... -> 3.33
        assert_eq!(mean_rating(&[3, 3, 4]), 3.33);
        // 11/3 = 3.666... -> 3.67
        assert_eq!(mean_rating(&[3, 4, 4]), 3.67);
    }

    #[test]
    fn mean_rounds_ties_to_even() {
        // 5/8 = 0.625 -> 0.62
        assert_eq!(mean_rating(&[1, 1, 1, 1, 1, 0, 0, 0]), 0.62);
        // 11/8 = 1.375 -> 1.38
        assert_eq!(mean_rating(&[2, 2, 2, 2, 1, 1, 1, 0]), 1.38);
    }

    #[test]
    fn mean_is_exact_for_large_sets() {
        let values = vec![10i16; 100_000];
        assert_eq!(mean_rating(&values), 10.0);

        let mut mixed = vec![7i16; 99_999];
        mixed.push(8);
        assert_eq!(mean_rating(&mixed), 7.0);
    }

    #[test]
    fn rating_value_bounds() {
        assert_eq!(validate_rating_value(0).unwrap(), 0);
        assert_eq!(validate_rating_value(10).unwrap(), 10);

        assert!(matches!(
            validate_rating_value(-1),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            validate_rating_value(11),
            Err(CatalogError::Validation(_))
        ));
    }

    async fn insert_user(pool: &Pool<Postgres>, username: String) -> i64 {
        sqlx::query("INSERT INTO users (username) VALUES ($1) RETURNING id;")
            .bind(username)
            .map(|row: PgRow| row.get(0))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a migrated database"]
    async fn concurrent_mutations_settle_on_the_final_rating_set() {
        let database_url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .unwrap();

        let suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let rater_a = insert_user(&pool, format!("ledger_rater_a_{}", suffix)).await;
        let rater_b = insert_user(&pool, format!("ledger_rater_b_{}", suffix)).await;
        let problem_pk: i64 = sqlx::query(
            r#"
            INSERT INTO problems (problem_id, name, contest_id, problem_index)
            VALUES ($1, 'Concurrent Ratings', 1, 'A')
            RETURNING id;
            "#,
        )
        .bind(format!("ledger-test-{}", suffix))
        .map(|row: PgRow| row.get(0))
        .fetch_one(&pool)
        .await
        .unwrap();

        // Both writers race on the same problem; the row lock forces the last
        // recompute to see both committed rating rows.
        for _ in 0..20 {
            let a = {
                let pool = pool.clone();
                tokio::spawn(
                    async move { RatingLedger::new(&pool).rate(rater_a, problem_pk, 10).await },
                )
            };
            let b = {
                let pool = pool.clone();
                tokio::spawn(
                    async move { RatingLedger::new(&pool).rate(rater_b, problem_pk, 0).await },
                )
            };
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();

            let stored: f64 = sqlx::query("SELECT average_rating FROM problems WHERE id = $1;")
                .bind(problem_pk)
                .map(|row: PgRow| row.get(0))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(stored, 5.0);

            RatingLedger::new(&pool)
                .remove(rater_a, problem_pk)
                .await
                .unwrap();
            RatingLedger::new(&pool)
                .remove(rater_b, problem_pk)
                .await
                .unwrap();
        }
    }
}
