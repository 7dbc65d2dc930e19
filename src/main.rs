use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use nomenclator::classifier::{ClassifierConfig, HierarchicalClassifier};
use nomenclator::db::Database;
use nomenclator::duplicates::{analyze, summarize};
use nomenclator::logging::configure_logging;
use nomenclator::pipeline::{run_pipeline, PipelineStageTracker, DEFAULT_CLASSIFICATION_CONCURRENCY};
use nomenclator::record::Record;
use nomenclator::taxonomy::Taxonomy;
use nomenclator::util::truncate_for_log;
use nomenclator::LLMClient;

#[derive(Parser)]
#[clap(name = "nomenclator", about = "Deduplicate and classify reference-data records")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate and classify records, writing the result as JSON
    Normalize {
        /// JSON array of records
        #[clap(short, long)]
        records: PathBuf,

        /// JSON taxonomy tree
        #[clap(short, long)]
        taxonomy: PathBuf,

        /// Output file
        #[clap(short, long, default_value = "normalized.json")]
        output: PathBuf,

        /// Classifications in flight at once
        #[clap(short, long, default_value_t = DEFAULT_CLASSIFICATION_CONCURRENCY)]
        concurrency: usize,

        /// Ignore model priorities stored by benchmark_models
        #[clap(long)]
        no_priorities: bool,
    },

    /// Show duplicate groups without classifying
    Duplicates {
        /// JSON array of records
        #[clap(short, long)]
        records: PathBuf,

        /// Print JSON instead of a table
        #[clap(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Cli::parse();

    match args.command {
        Commands::Normalize {
            records,
            taxonomy,
            output,
            concurrency,
            no_priorities,
        } => normalize(&records, &taxonomy, &output, concurrency, no_priorities).await,
        Commands::Duplicates { records, json } => show_duplicates(&records, json).await,
    }
}

async fn load_records(path: &Path) -> Result<Vec<Record>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read records file {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid records JSON in {}", path.display()))?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

async fn normalize(
    records_path: &Path,
    taxonomy_path: &Path,
    output_path: &Path,
    concurrency: usize,
    no_priorities: bool,
) -> Result<()> {
    let records = load_records(records_path).await?;
    let taxonomy = Arc::new(Taxonomy::from_path(taxonomy_path).await?);
    let client = LLMClient::from_env()?;
    info!("Using {} with {} taxonomy leaves", client.describe(), taxonomy.leaf_count());

    let mut config = ClassifierConfig::from_env();
    if !no_priorities {
        match Database::from_env().await {
            Ok(db) => {
                let ranked = db.model_order().await?;
                config.apply_priorities(&ranked);
            }
            Err(e) => warn!("Model priorities unavailable, keeping configured order: {}", e),
        }
    }
    info!("Model order: {:?}", config.models);

    let classifier = HierarchicalClassifier::new(taxonomy, Arc::new(client), config)?;
    let tracker = PipelineStageTracker::new();
    let output = run_pipeline(&records, &classifier, &tracker, concurrency).await;

    let json = serde_json::to_string_pretty(&output)?;
    tokio::fs::write(output_path, json)
        .await
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    info!(
        "Wrote {} records in {} groups to {} ({} merged)",
        output.records.len(),
        output.summary.total_groups,
        output_path.display(),
        output.summary.merged_records
    );
    Ok(())
}

async fn show_duplicates(records_path: &Path, json: bool) -> Result<()> {
    let records = load_records(records_path).await?;
    let groups = analyze(&records);
    let summary = summarize(&groups);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "groups": groups,
                "summary": summary,
            }))?
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Key"),
        Cell::new("Type"),
        Cell::new("Records"),
        Cell::new("Master"),
        Cell::new("Master Name"),
    ]));

    for group in &groups {
        let ids = group
            .record_ids()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(PrettyRow::new(vec![
            Cell::new(&group.key),
            Cell::new(&group.key_type),
            Cell::new(&ids),
            Cell::new(&group.master_item.id.to_string()),
            Cell::new(&truncate_for_log(&group.master_item.name, 40)),
        ]));
    }
    table.printstd();

    println!(
        "\n{} groups, {} records, {} merged",
        summary.total_groups, summary.total_records, summary.merged_records
    );
    for (key_type, count) in &summary.by_key_type {
        println!("  {}: {}", key_type, count);
    }

    Ok(())
}
