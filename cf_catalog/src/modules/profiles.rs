use crate::{
    modules::errors::Result,
    types::tables::{Profile, User},
};
use cf_catalog_libs::MetadataSource;
use sqlx::{postgres::Postgres, Pool};

const PROFILE_COLUMNS: &str =
    "user_id, codeforces_handle, bio, avatar_url, rating, max_rating, rank, max_rank";

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub codeforces_handle: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Result of a profile edit. The edit itself always persists; the cached
/// external stats refresh may fail independently, which is reported as a
/// warning rather than an error.
#[derive(Debug)]
pub struct ProfileSaved {
    pub profile: Profile,
    pub fetch_warning: Option<String>,
}

pub struct ProfileService<'a, S: MetadataSource> {
    pool: &'a Pool<Postgres>,
    source: &'a S,
}

impl<'a, S: MetadataSource> ProfileService<'a, S> {
    pub fn new(pool: &'a Pool<Postgres>, source: &'a S) -> Self {
        ProfileService { pool, source }
    }

    /// Creates the user account and its profile as two steps of one
    /// transaction. A duplicate username surfaces as a conflict.
    pub async fn register(&self, username: &str) -> Result<(User, Profile)> {
        let mut tx = self.pool.begin().await?;

        let user: User = sqlx::query_as(
            "INSERT INTO users (username) VALUES ($1) RETURNING id, username, created_at;",
        )
        .bind(username)
        .fetch_one(&mut tx)
        .await?;

        let profile: Profile = sqlx::query_as(&format!(
            "INSERT INTO profiles (user_id) VALUES ($1) RETURNING {};",
            PROFILE_COLUMNS
        ))
        .bind(user.id)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;
        tracing::info!("registered user {} ({})", user.username, user.id);

        Ok((user, profile))
    }

    /// Get-or-create fallback for read paths, covering accounts created by
    /// means that bypassed `register`.
    pub async fn ensure_profile(&self, user_id: i64) -> Result<Profile> {
        let profile = sqlx::query_as(&format!(
            r#"
            INSERT INTO profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {};
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let user =
            sqlx::query_as("SELECT id, username, created_at FROM users WHERE username = $1;")
                .bind(username)
                .fetch_optional(self.pool)
                .await?;

        Ok(user)
    }

    /// Persists the profile edit, then refreshes the cached Codeforces stats
    /// when a handle is set. A failed fetch leaves the edit saved.
    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<ProfileSaved> {
        self.ensure_profile(user_id).await?;

        let profile: Profile = sqlx::query_as(&format!(
            r#"
            UPDATE profiles
            SET codeforces_handle = $1, bio = $2, avatar_url = $3
            WHERE user_id = $4
            RETURNING {};
            "#,
            PROFILE_COLUMNS
        ))
        .bind(&update.codeforces_handle)
        .bind(&update.bio)
        .bind(&update.avatar_url)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let handle = match profile.codeforces_handle.as_deref() {
            Some(handle) if !handle.is_empty() => handle.to_string(),
            _ => {
                return Ok(ProfileSaved {
                    profile,
                    fetch_warning: None,
                })
            }
        };

        match self.source.fetch_user_info(&handle).await {
            Ok(info) => {
                let profile = sqlx::query_as(&format!(
                    r#"
                    UPDATE profiles
                    SET rating = $1, max_rating = $2, rank = $3, max_rank = $4
                    WHERE user_id = $5
                    RETURNING {};
                    "#,
                    PROFILE_COLUMNS
                ))
                .bind(info.rating)
                .bind(info.max_rating)
                .bind(&info.rank)
                .bind(&info.max_rank)
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

                Ok(ProfileSaved {
                    profile,
                    fetch_warning: None,
                })
            }
            Err(e) => {
                tracing::warn!("profile saved but codeforces fetch failed: {}", e);
                Ok(ProfileSaved {
                    profile,
                    fetch_warning: Some(format!(
                        "profile saved but codeforces fetch failed: {}",
                        e
                    )),
                })
            }
        }
    }
}
