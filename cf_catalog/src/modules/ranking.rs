use crate::{
    modules::{errors::Result, profiles::ProfileService},
    types::tables::{Profile, User},
};
use cf_catalog_libs::MetadataSource;
use itertools::Itertools;
use serde::Serialize;
use sqlx::{
    postgres::{PgRow, Postgres},
    Pool, Row,
};

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub user: User,
    pub profile: Profile,
    pub contribution_count: i64,
    pub stars: u8,
}

/// Star tier for a contribution count, by fixed thresholds.
pub fn stars(contribution_count: i64) -> u8 {
    match contribution_count {
        c if c >= 500 => 5,
        c if c >= 200 => 4,
        c if c >= 100 => 3,
        c if c >= 50 => 2,
        c if c >= 20 => 1,
        _ => 0,
    }
}

/// Orders entries by contribution count descending. The sort is stable, so
/// input order is preserved among equal counts.
pub fn rank(entries: Vec<(User, Profile, i64)>) -> Vec<LeaderboardEntry> {
    entries
        .into_iter()
        .map(|(user, profile, contribution_count)| LeaderboardEntry {
            stars: stars(contribution_count),
            user,
            profile,
            contribution_count,
        })
        .sorted_by(|a, b| b.contribution_count.cmp(&a.contribution_count))
        .collect()
}

/// Read-only aggregation over the rating ledger and progress tracker; owns no
/// state of its own.
pub struct ContributionRanker<'a> {
    pool: &'a Pool<Postgres>,
}

impl<'a> ContributionRanker<'a> {
    pub fn new(pool: &'a Pool<Postgres>) -> Self {
        ContributionRanker { pool }
    }

    pub async fn leaderboard<S: MetadataSource>(
        &self,
        profiles: &ProfileService<'_, S>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let users: Vec<User> =
            sqlx::query_as("SELECT id, username, created_at FROM users ORDER BY id;")
                .fetch_all(self.pool)
                .await?;

        let mut entries = Vec::with_capacity(users.len());
        for user in users {
            let profile = profiles.ensure_profile(user.id).await?;
            let count = self.contribution_count(user.id).await?;
            entries.push((user, profile, count));
        }

        Ok(rank(entries))
    }

    /// Distinct problems the user has either added to their collection or
    /// rated.
    pub async fn contribution_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM (
                SELECT problem_id FROM user_problems WHERE user_id = $1
                UNION
                SELECT problem_id FROM ratings WHERE user_id = $1
            ) AS contributions;
            "#,
        )
        .bind(user_id)
        .map(|row: PgRow| row.get(0))
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    fn entry(id: i64, count: i64) -> (User, Profile, i64) {
        (
            User {
                id,
                username: format!("user{}", id),
                created_at: Utc::now(),
            },
            Profile {
                user_id: id,
                codeforces_handle: None,
                bio: None,
                avatar_url: None,
                rating: None,
                max_rating: None,
                rank: None,
                max_rank: None,
            },
            count,
        )
    }

    #[test]
    fn star_tier_thresholds() {
        assert_eq!(stars(0), 0);
        assert_eq!(stars(19), 0);
        assert_eq!(stars(20), 1);
        assert_eq!(stars(50), 2);
        assert_eq!(stars(99), 2);
        assert_eq!(stars(100), 3);
        assert_eq!(stars(199), 3);
        assert_eq!(stars(200), 4);
        assert_eq!(stars(499), 4);
        assert_eq!(stars(500), 5);
        assert_eq!(stars(10_000), 5);
    }

    #[test]
    fn rank_orders_by_count_descending() {
        let ranked = rank(vec![entry(1, 500), entry(2, 199), entry(3, 200), entry(4, 50)]);

        let counts: Vec<i64> = ranked.iter().map(|e| e.contribution_count).collect();
        assert_eq!(counts, vec![500, 200, 199, 50]);

        let tiers: Vec<u8> = ranked.iter().map(|e| e.stars).collect();
        assert_eq!(tiers, vec![5, 4, 3, 2]);
    }

    #[test]
    fn rank_preserves_input_order_among_equal_counts() {
        let ranked = rank(vec![entry(7, 30), entry(3, 30), entry(9, 30)]);
        let ids: Vec<i64> = ranked.iter().map(|e| e.user.id).collect();
        assert_eq!(ids, vec![7, 3, 9]);
    }
}
