use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub user_id: i64,
    pub codeforces_handle: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub rank: Option<String>,
    pub max_rank: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Problem {
    pub id: i64,
    pub problem_id: String,
    pub name: String,
    pub contest_id: i32,
    pub problem_index: String,
    pub average_rating: f64,
    pub codeforces_rating: Option<i32>,
    pub codeforces_rating_estimated: bool,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rating {
    pub user_id: i64,
    pub problem_id: i64,
    pub value: i16,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProblem {
    pub user_id: i64,
    pub problem_id: i64,
    pub status: Option<String>,
    pub added_at: DateTime<Utc>,
}
