pub mod migrate;
pub mod refresh;
pub mod serve;

use anyhow::{Context, Result};
use cf_catalog_libs::codeforces::client::{CodeforcesClient, DEFAULT_API_URL};
use sqlx::{postgres::Postgres, Pool};
use std::env;

pub(crate) async fn connect_pool() -> Result<Pool<Postgres>> {
    let database_url: String = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;

    let pool: Pool<Postgres> = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .with_context(|| {
            let message = "Failed to create database connection pool.";
            tracing::error!(message);
            message
        })?;

    Ok(pool)
}

pub(crate) fn codeforces_client() -> Result<CodeforcesClient> {
    let api_url = env::var("CF_API_URL").unwrap_or_else(|_| {
        tracing::info!(
            "CF_API_URL environment variable is not set. Default value `{}` will be used.",
            DEFAULT_API_URL
        );
        String::from(DEFAULT_API_URL)
    });

    CodeforcesClient::new(&api_url).with_context(|| {
        let message = format!("couldn't create codeforces client for [{}]", api_url);
        tracing::error!(message);
        message
    })
}
