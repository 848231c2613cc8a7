//! Config file management

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::HearthConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with the default settings
    Init(InitArgs),
    /// Print the effective config (file, then environment overrides)
    Show,
    /// Load and validate the config file
    Validate,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Validate => run_validate(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let path = HearthConfig::config_path();

    if path.exists() && !args.force {
        return Err(anyhow!(
            "Config already exists at {}\n\nUse --force to overwrite",
            path.display()
        ));
    }

    HearthConfig::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config at: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Set DATABASE_URL (env, .env, or [database].url)");
    println!("  2. Run: hearth migrate");
    println!("  3. Run: hearth serve");
    Ok(())
}

fn run_show() -> Result<()> {
    let mut config = HearthConfig::load()?;
    // Connection strings usually carry a password
    if config.database.url.is_some() {
        config.database.url = Some("<set>".to_string());
    }

    let toml_str =
        toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);
    Ok(())
}

fn run_validate() -> Result<()> {
    let config = HearthConfig::load()?;
    println!("Config OK ({})", HearthConfig::config_path().display());

    if config.database.url.is_none() {
        println!("warning: no database URL; `serve` and `migrate` need DATABASE_URL");
    }
    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", HearthConfig::config_path().display());
    Ok(())
}
