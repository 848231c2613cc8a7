//! Built-in templates: list locally, deploy through the server

use anyhow::Result;
use clap::{Parser, Subcommand};
use hearth_core::Template;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{print_json, ApiClient, OutputFormat, ServerArgs};

#[derive(Parser, Debug)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: TemplateCommands,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List the templates shipped with hearth
    List,
    /// Create a new organization from a template
    Deploy(DeployArgs),
}

#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Template key (see `hearth template list`)
    pub key: String,

    /// Name of the new organization
    #[arg(long)]
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug)]
struct Deployment {
    organization_id: String,
    organization_code: String,
    entities_created: usize,
    relationships_created: usize,
}

pub async fn run_template(args: TemplateArgs) -> Result<()> {
    match args.command {
        TemplateCommands::List => list(args.server.output),
        TemplateCommands::Deploy(deploy) => {
            let client = ApiClient::new(&args.server.endpoint)?;
            let deployment: Deployment = client
                .post(
                    &format!("/api/templates/{}/deploy", deploy.key),
                    &json!({ "organization_name": deploy.name }),
                )
                .await?;

            match args.server.output {
                OutputFormat::Json => print_json(&deployment)?,
                OutputFormat::Human => println!(
                    "Deployed '{}' as {} ({}): {} entities, {} relationships",
                    deploy.key,
                    deployment.organization_code,
                    deployment.organization_id,
                    deployment.entities_created,
                    deployment.relationships_created
                ),
            }
            Ok(())
        }
    }
}

/// Templates are compiled in, so listing needs no server.
fn list(output: OutputFormat) -> Result<()> {
    let templates = Template::builtin_all()?;

    match output {
        OutputFormat::Json => print_json(&templates)?,
        OutputFormat::Human => {
            for t in &templates {
                println!(
                    "{:<12} {:<28} {} entities, {} relationships",
                    t.key,
                    t.name,
                    t.entities.len(),
                    t.relationships.len()
                );
            }
        }
    }
    Ok(())
}
