use crate::{
    cmd::{codeforces_client, connect_pool},
    modules::{
        catalog::{RatingRefresher, RefreshOptions},
        migration::MIGRATOR,
    },
};
use anyhow::Result;
use clap::Args;
use tokio::time::Duration;

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Delay between external API calls in seconds.
    #[arg(long, default_value_t = 0.2)]
    delay: f64,
    /// Report what would change without saving anything.
    #[arg(long)]
    dry_run: bool,
    /// Estimate missing difficulty ratings from local average user ratings.
    #[arg(long)]
    estimate: bool,
}

pub async fn run(args: RefreshArgs) -> Result<()> {
    let pool = connect_pool().await?;
    MIGRATOR.run(&pool).await?;
    let client = codeforces_client()?;

    let options = RefreshOptions {
        delay: Duration::from_secs_f64(args.delay.max(0.0)),
        dry_run: args.dry_run,
        estimate_missing: args.estimate,
    };
    let refresher = RatingRefresher::new(&pool, &client, options);
    let summary = refresher.run().await?;

    println!("--- Summary ---");
    println!("Total checked: {}", summary.checked);
    println!("API-updated: {}", summary.updated);
    println!("Already had rating: {}", summary.already_current);
    println!("Missing from API: {}", summary.missing);
    println!("Estimated (with --estimate): {}", summary.estimated);
    println!("Failed: {}", summary.failed);

    Ok(())
}
