//! Bulk upload from a JSON array or CSV file

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use hearth_core::{BulkKind, BulkReport};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::client::{print_json, ApiClient, OutputFormat, ServerArgs};

/// Columns that map to record properties rather than entity fields
const ENTITY_COLUMNS: [&str; 3] = ["entity_type", "entity_name", "entity_code"];

#[derive(Parser, Debug)]
pub struct BulkUploadArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Target organization ID
    #[arg(long)]
    pub org: Uuid,

    /// What the file holds: entities or users
    #[arg(long, value_parser = parse_kind)]
    pub kind: BulkKind,

    /// .json (array of records) or .csv (header row required)
    pub file: PathBuf,
}

fn parse_kind(s: &str) -> Result<BulkKind, String> {
    s.parse().map_err(|e: hearth_core::BulkError| e.to_string())
}

pub async fn run_bulk_upload(args: BulkUploadArgs) -> Result<()> {
    let records = read_records(&args.file, args.kind)?;
    tracing::info!(
        kind = %args.kind,
        records = records.len(),
        file = %args.file.display(),
        "uploading"
    );

    let client = ApiClient::new(&args.server.endpoint)?;
    let body = json!({ "organization_id": args.org, "records": records });
    let report: BulkReport = client
        .post(&format!("/api/bulk-upload/{}", args.kind), &body)
        .await?;

    match args.server.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &BulkReport) {
    println!(
        "{} of {} records created, {} failed",
        report.created, report.total, report.failed
    );
    for err in &report.errors {
        println!("  record {}: {}", err.index, err.message);
    }
}

fn read_records(path: &Path, kind: BulkKind) -> Result<Vec<Value>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("json") => read_json(path),
        Some("csv") => read_csv(path, kind),
        _ => bail!("{}: expected a .json or .csv file", path.display()),
    }
}

fn read_json(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let value: Value = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(anyhow!("{}: expected a JSON array of records", path.display())),
    }
}

fn read_csv(path: &Path, kind: BulkKind) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header in {}", path.display()))?
        .clone();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        // header is line 1
        let row = row.with_context(|| format!("Failed to parse CSV line {}", line + 2))?;
        let pairs = headers.iter().zip(row.iter());
        records.push(match kind {
            BulkKind::Entities => entity_row(pairs),
            BulkKind::Users => user_row(pairs),
        });
    }

    Ok(records)
}

/// Known columns become record properties, the rest entity fields.
/// Empty cells are left out.
fn entity_row<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    let mut record = Map::new();
    let mut fields = Map::new();

    for (column, cell) in pairs.filter(|(_, cell)| !cell.is_empty()) {
        if ENTITY_COLUMNS.contains(&column) {
            record.insert(column.to_string(), Value::String(cell.to_string()));
        } else {
            fields.insert(column.to_string(), cell_value(cell));
        }
    }

    record.insert("fields".to_string(), Value::Object(fields));
    Value::Object(record)
}

fn user_row<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    Value::Object(
        pairs
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(column, cell)| (column.to_string(), Value::String(cell.to_string())))
            .collect(),
    )
}

/// CSV cells carry no types: numbers and booleans are recognized, the rest
/// stays text.
fn cell_value(cell: &str) -> Value {
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => cell
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| json!(n))
            .unwrap_or_else(|| Value::String(cell.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_entities_split_fields_from_columns() {
        let file = write_temp(
            ".csv",
            "entity_type,entity_name,entity_code,price_cents,vegan,notes\n\
             menu_item,Margherita,MARG,1150,true,\n\
             menu_item, Espresso ,,250,false,double shot\n",
        );

        let records = read_records(file.path(), BulkKind::Entities).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            json!({
                "entity_type": "menu_item",
                "entity_name": "Margherita",
                "entity_code": "MARG",
                "fields": { "price_cents": 1150.0, "vegan": true }
            })
        );
        assert_eq!(records[1]["entity_name"], "Espresso");
        assert!(records[1].get("entity_code").is_none());
        assert_eq!(records[1]["fields"]["notes"], "double shot");
    }

    #[test]
    fn csv_users_keep_text_cells() {
        let file = write_temp(".csv", "name,email,role\nAna,ana@example.com,manager\n");
        let records = read_records(file.path(), BulkKind::Users).unwrap();
        assert_eq!(
            records,
            vec![json!({ "name": "Ana", "email": "ana@example.com", "role": "manager" })]
        );
    }

    #[test]
    fn json_must_be_an_array() {
        let file = write_temp(".json", r#"{ "entity_name": "Solo" }"#);
        let err = read_records(file.path(), BulkKind::Entities).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));

        let file = write_temp(".json", r#"[{ "entity_name": "One" }, {}]"#);
        assert_eq!(read_records(file.path(), BulkKind::Entities).unwrap().len(), 2);
    }

    #[test]
    fn other_extensions_are_rejected() {
        let file = write_temp(".xlsx", "");
        assert!(read_records(file.path(), BulkKind::Users).is_err());
    }

    #[test]
    fn cell_values() {
        assert_eq!(cell_value("12.5"), json!(12.5));
        assert_eq!(cell_value("NaN"), json!("NaN"));
        assert_eq!(cell_value("TRUE"), json!("TRUE"));
    }
}
