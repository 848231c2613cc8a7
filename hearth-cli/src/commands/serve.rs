//! HTTP server command

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use hearth_core::HearthConfig;
use hearth_server::db::{create_pool_with_options, migrations};
use hearth_server::http::{run_server, AppState, ServerConfig};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default from config, 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Skip schema creation on start
    #[arg(long)]
    pub no_migrate: bool,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = HearthConfig::load().context("Failed to load configuration")?;
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }

    let database_url = config
        .database_url()
        .context("Set --database-url, DATABASE_URL, or [database].url in ~/.hearth/config.toml")?;

    let pool = create_pool_with_options(database_url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    if config.database.run_migrations && !args.no_migrate {
        migrations::run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let server_config = ServerConfig::from(&config);
    tracing::info!(bind = %server_config.bind_addr, "Starting hearth server");

    run_server(AppState::new(pool, config), server_config)
        .await
        .context("Server error")?;

    Ok(())
}
