use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use prettytable::{Cell, Row as PrettyRow, Table};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use nomenclator::benchmark::{
    BenchmarkConfig, BenchmarkReport, BenchmarkRun, ModelBenchmarkHarness, SharedClassifierFactory,
};
use nomenclator::classifier::ClassifierConfig;
use nomenclator::db::Database;
use nomenclator::environment::get_env_var_as_vec;
use nomenclator::logging::configure_logging;
use nomenclator::taxonomy::Taxonomy;
use nomenclator::LLMClient;

/// Measures each candidate model against a battery of nomenclature items and
/// stores the resulting model order for the classifier.
///
/// Usage:
///    cargo run --bin benchmark_models -- --taxonomy taxonomy.json --models llama3,qwen2.5
#[derive(Parser)]
#[clap(name = "benchmark_models", about = "Rank classification models by speed and reliability")]
struct Args {
    /// JSON taxonomy tree
    #[clap(short, long)]
    taxonomy: PathBuf,

    /// Candidate models; defaults to CLASSIFIER_MODELS
    #[clap(short, long, value_delimiter = ',')]
    models: Vec<String>,

    /// File with one sample item per line; defaults to the built-in battery
    #[clap(short, long)]
    samples: Option<PathBuf>,

    /// Attempts per sample
    #[clap(long, default_value_t = 3)]
    max_retries: u32,

    /// Base retry delay in milliseconds, doubled after each failed attempt
    #[clap(long, default_value_t = 500)]
    retry_delay_ms: u64,

    /// Print results without saving history or priorities
    #[clap(long)]
    dry_run: bool,

    /// Also print this many of the latest stored runs and the table sizes
    #[clap(long)]
    history: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Args::parse();

    let models = if args.models.is_empty() {
        get_env_var_as_vec("CLASSIFIER_MODELS", ',')
    } else {
        args.models.clone()
    };
    if models.is_empty() {
        bail!("No models to benchmark: pass --models or set CLASSIFIER_MODELS");
    }

    let samples: Vec<String> = match &args.samples {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read samples file {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    let taxonomy = Arc::new(Taxonomy::from_path(&args.taxonomy).await?);
    let client = LLMClient::from_env()?;
    info!("Benchmarking against {} with {} taxonomy leaves", client.describe(), taxonomy.leaf_count());

    let factory = SharedClassifierFactory::new(taxonomy, Arc::new(client), ClassifierConfig::from_env());
    let harness = ModelBenchmarkHarness::new(Arc::new(factory), BenchmarkConfig::from_env());

    let started_at = Utc::now();
    let runs = harness
        .benchmark(
            &models,
            &samples,
            args.max_retries,
            Duration::from_millis(args.retry_delay_ms),
        )
        .await;
    let report = BenchmarkReport::new(started_at, runs);

    print_runs(&report.runs);

    if !args.dry_run {
        let db = Database::from_env().await?;
        db.save_report(&report).await?;
        db.update_priorities(&report.runs).await?;
        info!("Stored report {}; model order is now {:?}", report.id, report.ranking());

        if let Some(limit) = args.history {
            let history = db.recent_history(limit).await?;
            let stats = db.collect_stats().await?;
            println!(
                "\nLatest {} stored runs (history:priorities rows {}):",
                history.len(),
                stats
            );
            let runs: Vec<BenchmarkRun> = history.into_iter().map(|entry| entry.run).collect();
            print_runs(&runs);
        }
    }

    Ok(())
}

fn print_runs(runs: &[BenchmarkRun]) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Priority"),
        Cell::new("Model"),
        Cell::new("Status"),
        Cell::new("OK/Total"),
        Cell::new("Speed/s"),
        Cell::new("Avg ms"),
        Cell::new("Median ms"),
        Cell::new("P95 ms"),
        Cell::new("Min ms"),
        Cell::new("Max ms"),
        Cell::new("Error"),
    ]));

    for run in runs {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&run.priority.to_string()),
            Cell::new(&run.model),
            Cell::new(&run.status.to_string()),
            Cell::new(&format!("{}/{}", run.success_count, run.total_requests)),
            Cell::new(&format!("{:.2}", run.speed)),
            Cell::new(&format!("{:.0}", run.avg_latency_ms)),
            Cell::new(&format!("{:.0}", run.median_latency_ms)),
            Cell::new(&format!("{:.0}", run.p95_latency_ms)),
            Cell::new(&format!("{:.0}", run.min_latency_ms)),
            Cell::new(&format!("{:.0}", run.max_latency_ms)),
            Cell::new(run.error.as_deref().unwrap_or("")),
        ]));
    }

    table.printstd();
}
