//! Schema creation without starting the server

use anyhow::{Context, Result};
use clap::Parser;
use hearth_core::HearthConfig;
use hearth_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let url = match args.database_url {
        Some(url) => url,
        None => HearthConfig::load()?.database_url()?.to_string(),
    };

    let pool = create_pool(&url)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    println!("Schema is up to date");
    Ok(())
}
