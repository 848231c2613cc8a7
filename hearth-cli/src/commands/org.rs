//! Organization commands against a running server

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{print_json, ApiClient, OutputFormat, ServerArgs};

#[derive(Parser, Debug)]
pub struct OrgArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: OrgCommands,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    /// List organizations
    List(ListArgs),
    /// Create an organization
    Create(CreateArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Include deactivated organizations
    #[arg(long)]
    pub include_inactive: bool,
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Organization name
    #[arg(long, short)]
    pub name: String,

    /// Organization type
    #[arg(long, short = 't', default_value = "restaurant")]
    pub organization_type: String,

    /// Industry label
    #[arg(long)]
    pub industry: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
struct Organization {
    id: String,
    organization_name: String,
    organization_code: String,
    organization_type: String,
    is_active: bool,
}

#[derive(Deserialize, Serialize, Debug)]
struct OrganizationPage {
    items: Vec<Organization>,
    total: i64,
    page: u32,
    per_page: u32,
}

pub async fn run_org(args: OrgArgs) -> Result<()> {
    let client = ApiClient::new(&args.server.endpoint)?;
    let output = args.server.output;

    match args.command {
        OrgCommands::List(list) => {
            let path = format!(
                "/api/core/organizations?page={}&include_inactive={}",
                list.page, list.include_inactive
            );
            let page: OrganizationPage = client.get(&path).await?;
            match output {
                OutputFormat::Json => print_json(&page)?,
                OutputFormat::Human => print_page(&page),
            }
        }
        OrgCommands::Create(create) => {
            let body = json!({
                "organization_name": create.name,
                "organization_type": create.organization_type,
                "industry": create.industry,
            });
            let created: Value = client.post("/api/core/organizations", &body).await?;
            match output {
                OutputFormat::Json => print_json(&created)?,
                OutputFormat::Human => println!(
                    "Created {} ({})",
                    created["organization_code"].as_str().unwrap_or("?"),
                    created["id"].as_str().unwrap_or("?")
                ),
            }
        }
    }

    Ok(())
}

fn print_page(page: &OrganizationPage) {
    if page.items.is_empty() {
        println!("No organizations");
        return;
    }

    for org in &page.items {
        let marker = if org.is_active { "" } else { " (inactive)" };
        println!(
            "{:<18} {:<30} {:<12} {}{}",
            org.organization_code, org.organization_name, org.organization_type, org.id, marker
        );
    }
    println!("\npage {} ({} per page), {} total", page.page, page.per_page, page.total);
}
