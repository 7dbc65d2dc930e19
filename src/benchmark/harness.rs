use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use super::samples::default_samples;
use super::stats::{rank_runs, SampleAccumulator};
use super::types::{BenchmarkRun, SampleOutcome};
use crate::classifier::{backoff_delay, ClassifierConfig, HierarchicalClassifier};
use crate::environment::{get_env_secs, get_env_var_or};
use crate::llm::ClassificationBackend;
use crate::taxonomy::Taxonomy;
use crate::TARGET_BENCHMARK;

const MODEL_DEADLINE_EXCEEDED: &str = "model deadline exceeded before the sample finished";
const SAMPLE_TASK_FAILED: &str = "sample task did not complete";

/// Resource limits for one benchmark invocation.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    // In-flight samples per model
    pub max_concurrency: usize,
    // Applies to each attempt
    pub sample_timeout: Duration,
    pub model_timeout: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            sample_timeout: Duration::from_secs(120),
            model_timeout: Duration::from_secs(600),
        }
    }
}

impl BenchmarkConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrency: get_env_var_or("BENCHMARK_MAX_CONCURRENCY", defaults.max_concurrency)
                .max(1),
            sample_timeout: get_env_secs("BENCHMARK_SAMPLE_TIMEOUT_SECS", 120),
            model_timeout: get_env_secs("BENCHMARK_MODEL_TIMEOUT_SECS", 600),
        }
    }
}

/// Builds the classifier a single model is benchmarked with.
pub trait ClassifierFactory: Send + Sync {
    fn build(&self, model: &str) -> Result<HierarchicalClassifier>;
}

/// Factory sharing one taxonomy and backend; each classifier is pinned to one model.
pub struct SharedClassifierFactory {
    taxonomy: Arc<Taxonomy>,
    backend: Arc<dyn ClassificationBackend>,
    config: ClassifierConfig,
}

impl SharedClassifierFactory {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        backend: Arc<dyn ClassificationBackend>,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            taxonomy,
            backend,
            config,
        }
    }
}

impl ClassifierFactory for SharedClassifierFactory {
    fn build(&self, model: &str) -> Result<HierarchicalClassifier> {
        HierarchicalClassifier::new(
            self.taxonomy.clone(),
            self.backend.clone(),
            self.config.clone().with_models(vec![model.to_string()]),
        )
    }
}

/// Measures every candidate model against the same samples, concurrently across
/// models and across samples within a model.
pub struct ModelBenchmarkHarness {
    factory: Arc<dyn ClassifierFactory>,
    config: BenchmarkConfig,
}

impl ModelBenchmarkHarness {
    pub fn new(factory: Arc<dyn ClassifierFactory>, config: BenchmarkConfig) -> Self {
        Self { factory, config }
    }

    /// Benchmarks `models` and returns one run per distinct model, best first.
    ///
    /// `max_retries` is the number of attempts each sample gets (at least one),
    /// with `retry_delay * 2^attempt` between them. An empty `samples` slice
    /// means the default battery.
    pub async fn benchmark(
        &self,
        models: &[String],
        samples: &[String],
        max_retries: u32,
        retry_delay: Duration,
    ) -> Vec<BenchmarkRun> {
        let samples = Arc::new(if samples.is_empty() {
            default_samples()
        } else {
            samples.to_vec()
        });
        let mut distinct: Vec<String> = Vec::with_capacity(models.len());
        for model in models {
            if !distinct.contains(model) {
                distinct.push(model.clone());
            }
        }

        info!(target: TARGET_BENCHMARK, "Benchmarking {} models on {} samples", distinct.len(), samples.len());

        let results: Arc<Mutex<Vec<BenchmarkRun>>> =
            Arc::new(Mutex::new(Vec::with_capacity(distinct.len())));
        let mut model_tasks = JoinSet::new();

        for model in &distinct {
            let factory = self.factory.clone();
            let config = self.config.clone();
            let samples = samples.clone();
            let results = results.clone();
            let model = model.clone();
            model_tasks.spawn(async move {
                let run =
                    benchmark_model(factory.as_ref(), &config, &model, samples, max_retries, retry_delay)
                        .await;
                results.lock().await.push(run);
            });
        }

        while let Some(joined) = model_tasks.join_next().await {
            if let Err(e) = joined {
                error!(target: TARGET_BENCHMARK, "Model benchmark task failed: {}", e);
            }
        }

        let mut runs = std::mem::take(&mut *results.lock().await);
        for model in &distinct {
            if !runs.iter().any(|run| &run.model == model) {
                runs.push(BenchmarkRun::construction_failure(
                    model,
                    &samples,
                    "benchmark task failed",
                ));
            }
        }

        rank_runs(&mut runs);
        runs
    }
}

async fn benchmark_model(
    factory: &dyn ClassifierFactory,
    config: &BenchmarkConfig,
    model: &str,
    samples: Arc<Vec<String>>,
    max_retries: u32,
    retry_delay: Duration,
) -> BenchmarkRun {
    let classifier = match factory.build(model) {
        Ok(classifier) => Arc::new(classifier),
        Err(e) => {
            warn!(target: TARGET_BENCHMARK, "[{}] classifier construction failed: {:#}", model, e);
            return BenchmarkRun::construction_failure(model, &samples, &format!("{:#}", e));
        }
    };

    let attempts = max_retries.max(1);
    let accumulator = Arc::new(SampleAccumulator::new(samples.len()));
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    let started = Instant::now();
    let mut sample_tasks = JoinSet::new();

    for (index, sample) in samples.iter().enumerate() {
        let classifier = classifier.clone();
        let accumulator = accumulator.clone();
        let semaphore = semaphore.clone();
        let model = model.to_string();
        let sample = sample.clone();
        let sample_timeout = config.sample_timeout;
        sample_tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let (outcome, latency) =
                run_sample(&classifier, &model, &sample, attempts, retry_delay, sample_timeout)
                    .await;
            accumulator.record(index, outcome, latency);
        });
    }

    let drained = timeout(config.model_timeout, async {
        while let Some(joined) = sample_tasks.join_next().await {
            if let Err(e) = joined {
                error!(target: TARGET_BENCHMARK, "Sample task failed: {}", e);
            }
        }
    })
    .await;
    let wall_clock = started.elapsed();

    let unfinished_reason = if drained.is_err() {
        warn!(target: TARGET_BENCHMARK, "[{}] model deadline of {:?} exceeded, aborting unfinished samples", model, config.model_timeout);
        sample_tasks.abort_all();
        while sample_tasks.join_next().await.is_some() {}
        MODEL_DEADLINE_EXCEEDED
    } else {
        SAMPLE_TASK_FAILED
    };

    let run = accumulator.finish(model, &samples, wall_clock, unfinished_reason);
    info!(
        target: TARGET_BENCHMARK,
        "[{}] {}: {}/{} ok, {:.2} samples/s, avg {:.0}ms, p95 {:.0}ms",
        model,
        run.status,
        run.success_count,
        run.total_requests,
        run.speed,
        run.avg_latency_ms,
        run.p95_latency_ms
    );
    run
}

async fn run_sample(
    classifier: &HierarchicalClassifier,
    model: &str,
    sample: &str,
    attempts: u32,
    retry_delay: Duration,
    sample_timeout: Duration,
) -> (SampleOutcome, Duration) {
    let started = Instant::now();
    let mut last_error = String::new();

    for attempt in 0..attempts {
        let result = match timeout(sample_timeout, classifier.classify_with_model(sample, "", model)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("timed out after {:?}", sample_timeout)),
        };

        match result {
            Ok(classification) => {
                let latency = started.elapsed();
                debug!(target: TARGET_BENCHMARK, "[{}] '{}' -> {} in {:?}", model, sample, classification.code, latency);
                return (
                    SampleOutcome {
                        sample: sample.to_string(),
                        success: true,
                        latency_ms: latency.as_secs_f64() * 1000.0,
                        attempts: attempt + 1,
                        code: Some(classification.code),
                        error: None,
                    },
                    latency,
                );
            }
            Err(e) => {
                debug!(target: TARGET_BENCHMARK, "[{}] '{}' attempt {}/{} failed: {:#}", model, sample, attempt + 1, attempts, e);
                last_error = format!("{:#}", e);
                if attempt + 1 < attempts {
                    sleep(backoff_delay(retry_delay, attempt)).await;
                }
            }
        }
    }

    let latency = started.elapsed();
    (
        SampleOutcome {
            sample: sample.to_string(),
            success: false,
            latency_ms: latency.as_secs_f64() * 1000.0,
            attempts,
            code: None,
            error: Some(last_error),
        },
        latency,
    )
}
