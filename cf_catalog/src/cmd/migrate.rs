use crate::{cmd::connect_pool, modules::migration::MIGRATOR};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct MigrateArgs {}

pub async fn run(_args: MigrateArgs) -> Result<()> {
    let pool = connect_pool().await?;
    MIGRATOR.run(&pool).await?;
    tracing::info!("migrations applied");

    Ok(())
}
