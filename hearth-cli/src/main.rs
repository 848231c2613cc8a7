//! hearth - restaurant back office over a universal entity schema
//!
//! - `serve`: run the HTTP API
//! - `migrate`: create or update the database schema
//! - `config`: write, show and locate ~/.hearth/config.toml
//! - `org`, `bulk-upload`, `template`: talk to a running server

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod client;
mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "hearth",
    author,
    version,
    about = "Back office API for restaurants: organizations, entities, purchasing, templates"
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::ServeArgs),
    /// Create or update the database schema
    Migrate(commands::MigrateArgs),
    /// Manage hearth configuration
    Config(commands::ConfigArgs),
    /// List or create organizations on a running server
    Org(commands::OrgArgs),
    /// Upload entities or users from a JSON or CSV file
    BulkUpload(commands::BulkUploadArgs),
    /// List built-in templates or deploy one as a new organization
    Template(commands::TemplateArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    hearth_core::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Migrate(args) => commands::run_migrate(args).await,
        Commands::Config(args) => commands::run_config(args),
        Commands::Org(args) => commands::run_org(args).await,
        Commands::BulkUpload(args) => commands::run_bulk_upload(args).await,
        Commands::Template(args) => commands::run_template(args).await,
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}
