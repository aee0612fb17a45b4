//! askql CLI: load a CSV, ask a question in plain English, print rows.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use askql::store::CellValue;
use askql::{Dataset, HttpModelClient, PipelineConfig, QueryPipeline, QuerySession, ResultSet};

#[derive(Parser)]
#[command(name = "askql", about = "Query a CSV file in plain English", version)]
struct Cli {
    /// Path to the CSV file to load.
    #[arg(short, long)]
    file: std::path::PathBuf,

    /// Natural-language question to run against the data.
    question: String,

    /// Print the first rows of the loaded dataset before querying.
    #[arg(long)]
    preview: bool,

    /// Table name for the materialized dataset (default from ASKQL_TABLE_NAME).
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("loading configuration")?;
    let table_name = cli.table.as_deref().unwrap_or(&config.table_name);

    let dataset = Dataset::from_csv_path(&cli.file, table_name)
        .with_context(|| format!("loading {}", cli.file.display()))?;
    eprintln!(
        "loaded {} rows into '{}' ({})",
        dataset.row_count(),
        table_name,
        dataset.schema.describe()
    );

    if cli.preview {
        print_rows(
            &dataset.schema.column_names(),
            dataset.preview(5).iter().map(|r| r.clone()).collect(),
        );
    }

    let session = QuerySession::new(&dataset)?;
    let client = HttpModelClient::from_config(&config)?;
    let pipeline = QueryPipeline::new(client, config.max_attempts);

    let outcome = pipeline
        .run(&session, &cli.question)
        .await
        .context("running query")?;

    println!("sql: {}", outcome.sql);
    if outcome.result.rows.is_empty() {
        println!("no rows");
    } else {
        print_result(&outcome.result);
    }
    Ok(())
}

fn print_result(result: &ResultSet) {
    let columns: Vec<&str> = result.columns.iter().map(|c| c.as_str()).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(CellValue::to_display).collect())
        .collect();
    print_rows(&columns, rows);
}

/// Print an aligned text table: header, separator, rows.
fn print_rows(columns: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<1$}", c, widths[i]))
        .collect();
    println!("{}", header.join("  "));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<1$}", cell, widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", line.join("  "));
    }
}
