use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::types::{BenchmarkRun, BenchmarkStatus, SampleOutcome};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Linear-interpolated percentile of an ascending slice; 0 for an empty one.
pub fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = fraction.clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LatencyBounds {
    min: Duration,
    max: Duration,
}

/// Per-model results shared by concurrently running sample tasks.
///
/// Counters are atomics. The min/max pair is a read-modify-write over two
/// values and sits behind a mutex, as do the latency list and the outcomes.
/// `record` never awaits, so an aborted task cannot leave it half-applied.
pub struct SampleAccumulator {
    success_count: AtomicUsize,
    error_count: AtomicUsize,
    success_micros: AtomicU64,
    bounds: Mutex<Option<LatencyBounds>>,
    latencies: Mutex<Vec<Duration>>,
    outcomes: Mutex<Vec<Option<SampleOutcome>>>,
}

impl SampleAccumulator {
    pub fn new(sample_count: usize) -> Self {
        SampleAccumulator {
            success_count: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            success_micros: AtomicU64::new(0),
            bounds: Mutex::new(None),
            latencies: Mutex::new(Vec::with_capacity(sample_count)),
            outcomes: Mutex::new(vec![None; sample_count]),
        }
    }

    pub fn record(&self, index: usize, outcome: SampleOutcome, latency: Duration) {
        {
            let mut outcomes = lock(&self.outcomes);
            match outcomes.get_mut(index) {
                Some(slot) if slot.is_none() => *slot = Some(outcome.clone()),
                // Unknown or already recorded sample
                _ => return,
            }
        }

        if !outcome.success {
            self.error_count.fetch_add(1, Ordering::SeqCst);
            return;
        }

        self.success_count.fetch_add(1, Ordering::SeqCst);
        self.success_micros.fetch_add(
            u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            Ordering::SeqCst,
        );
        lock(&self.latencies).push(latency);

        let mut bounds = lock(&self.bounds);
        *bounds = Some(match *bounds {
            None => LatencyBounds {
                min: latency,
                max: latency,
            },
            Some(current) => LatencyBounds {
                min: current.min.min(latency),
                max: current.max.max(latency),
            },
        });
    }

    pub fn success_count(&self) -> usize {
        self.success_count.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::SeqCst)
    }

    /// Builds the model's run. Samples that never reported are counted as errors
    /// carrying `unfinished_reason`.
    pub fn finish(
        &self,
        model: &str,
        samples: &[String],
        wall_clock: Duration,
        unfinished_reason: &str,
    ) -> BenchmarkRun {
        let mut unfinished = 0;
        let outcomes: Vec<SampleOutcome> = lock(&self.outcomes)
            .iter()
            .zip(samples)
            .map(|(outcome, sample)| match outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    unfinished += 1;
                    SampleOutcome {
                        sample: sample.clone(),
                        success: false,
                        latency_ms: millis(wall_clock),
                        attempts: 0,
                        code: None,
                        error: Some(unfinished_reason.to_string()),
                    }
                }
            })
            .collect();

        let success_count = self.success_count();
        let error_count = self.error_count() + unfinished;

        let mut sorted: Vec<f64> = lock(&self.latencies).iter().copied().map(millis).collect();
        sorted.sort_by(f64::total_cmp);

        let (min_latency_ms, max_latency_ms) = match *lock(&self.bounds) {
            Some(bounds) => (millis(bounds.min), millis(bounds.max)),
            None => (0.0, 0.0),
        };

        let avg_latency_ms = if success_count > 0 {
            self.success_micros.load(Ordering::SeqCst) as f64 / success_count as f64 / 1000.0
        } else {
            0.0
        };

        let wall_clock_secs = wall_clock.as_secs_f64();
        let speed = if wall_clock_secs > 0.0 {
            success_count as f64 / wall_clock_secs
        } else {
            0.0
        };

        let total_requests = outcomes.len();
        let success_rate = if total_requests > 0 {
            success_count as f64 / total_requests as f64
        } else {
            0.0
        };

        BenchmarkRun {
            model: model.to_string(),
            priority: 0,
            speed,
            success_count,
            error_count,
            total_requests,
            success_rate,
            avg_latency_ms,
            median_latency_ms: percentile(&sorted, 0.5),
            p95_latency_ms: percentile(&sorted, 0.95),
            min_latency_ms,
            max_latency_ms,
            wall_clock_ms: millis(wall_clock),
            status: BenchmarkStatus::from_counts(success_count, error_count),
            error: None,
            samples: outcomes,
        }
    }
}

impl BenchmarkRun {
    /// Run for a model whose classifier could not be built: every sample failed.
    pub fn construction_failure(model: &str, samples: &[String], error: &str) -> Self {
        let accumulator = SampleAccumulator::new(samples.len());
        let mut run = accumulator.finish(model, samples, Duration::ZERO, error);
        run.error = Some(error.to_string());
        run
    }
}

/// Sorts by speed then success rate, both descending, and assigns 1-based priorities.
pub fn rank_runs(runs: &mut [BenchmarkRun]) {
    runs.sort_by(|a, b| {
        b.speed
            .total_cmp(&a.speed)
            .then_with(|| b.success_rate.total_cmp(&a.success_rate))
            .then_with(|| a.model.cmp(&b.model))
    });
    for (index, run) in runs.iter_mut().enumerate() {
        run.priority = index + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(sample: &str, success: bool, latency: Duration) -> SampleOutcome {
        SampleOutcome {
            sample: sample.to_string(),
            success,
            latency_ms: millis(latency),
            attempts: 1,
            code: None,
            error: None,
        }
    }

    fn samples(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("sample {}", i)).collect()
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[42.0], 0.95), 42.0);
        assert_eq!(percentile(&[100.0, 150.0], 0.5), 125.0);
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0, 50.0], 0.5), 30.0);
        assert!((percentile(&[10.0, 20.0, 30.0, 40.0, 50.0], 0.95) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_ignore_failures_and_order() {
        let accumulator = SampleAccumulator::new(4);
        accumulator.record(3, outcome("c", true, Duration::from_millis(300)), Duration::from_millis(300));
        accumulator.record(0, outcome("a", false, Duration::from_millis(5000)), Duration::from_millis(5000));
        accumulator.record(1, outcome("b", true, Duration::from_millis(100)), Duration::from_millis(100));
        accumulator.record(2, outcome("d", true, Duration::from_millis(200)), Duration::from_millis(200));

        let run = accumulator.finish("m", &samples(4), Duration::from_millis(500), "unfinished");
        assert_eq!(run.success_count, 3);
        assert_eq!(run.error_count, 1);
        assert_eq!(run.total_requests, 4);
        assert_eq!(run.status, BenchmarkStatus::Partial);
        assert_eq!(run.min_latency_ms, 100.0);
        assert_eq!(run.max_latency_ms, 300.0);
        assert_eq!(run.median_latency_ms, 200.0);
        assert_eq!(run.avg_latency_ms, 200.0);
        assert_eq!(run.speed, 6.0);
        assert_eq!(run.success_rate, 0.75);
        assert!(run.min_latency_ms <= run.median_latency_ms);
        assert!(run.median_latency_ms <= run.p95_latency_ms);
        assert!(run.p95_latency_ms <= run.max_latency_ms);
    }

    #[test]
    fn test_zero_successes_report_zeros() {
        let accumulator = SampleAccumulator::new(2);
        accumulator.record(0, outcome("a", false, Duration::from_millis(10)), Duration::from_millis(10));

        let run = accumulator.finish("m", &samples(2), Duration::from_millis(50), "deadline");
        assert_eq!(run.success_count, 0);
        assert_eq!(run.error_count, 2);
        assert_eq!(run.status, BenchmarkStatus::Failed);
        assert_eq!(run.samples[1].error.as_deref(), Some("deadline"));
        for value in [
            run.avg_latency_ms,
            run.median_latency_ms,
            run.p95_latency_ms,
            run.min_latency_ms,
            run.max_latency_ms,
            run.speed,
        ] {
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn test_unfinished_samples_add_to_recorded_errors() {
        let accumulator = SampleAccumulator::new(5);
        accumulator.record(0, outcome("a", true, Duration::from_millis(40)), Duration::from_millis(40));
        accumulator.record(1, outcome("b", false, Duration::from_millis(90)), Duration::from_millis(90));
        accumulator.record(4, outcome("e", false, Duration::from_millis(70)), Duration::from_millis(70));
        assert_eq!(accumulator.error_count(), 2);

        let run = accumulator.finish("m", &samples(5), Duration::from_millis(200), "deadline");
        assert_eq!(run.success_count, 1);
        assert_eq!(run.error_count, 4);
        assert_eq!(run.success_count + run.error_count, run.total_requests);
        let failed = run.samples.iter().filter(|s| !s.success).count();
        assert_eq!(failed, run.error_count);
        let timed_out: Vec<&str> = run
            .samples
            .iter()
            .filter(|s| s.error.as_deref() == Some("deadline"))
            .map(|s| s.sample.as_str())
            .collect();
        assert_eq!(timed_out, vec!["sample 2", "sample 3"]);
    }

    #[test]
    fn test_duplicate_record_is_ignored() {
        let accumulator = SampleAccumulator::new(1);
        accumulator.record(0, outcome("a", true, Duration::from_millis(10)), Duration::from_millis(10));
        accumulator.record(0, outcome("a", true, Duration::from_millis(10)), Duration::from_millis(10));
        accumulator.record(7, outcome("z", false, Duration::ZERO), Duration::ZERO);
        assert_eq!(accumulator.success_count(), 1);
        assert_eq!(accumulator.error_count(), 0);
    }

    #[test]
    fn test_construction_failure_is_fully_errored() {
        let run = BenchmarkRun::construction_failure("m", &samples(3), "taxonomy unavailable");
        assert_eq!(run.success_count, 0);
        assert_eq!(run.error_count, 3);
        assert_eq!(run.status, BenchmarkStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("taxonomy unavailable"));
        assert_eq!(run.speed, 0.0);
    }

    #[test]
    fn test_status_from_counts() {
        assert_eq!(BenchmarkStatus::from_counts(0, 3), BenchmarkStatus::Failed);
        assert_eq!(BenchmarkStatus::from_counts(2, 1), BenchmarkStatus::Partial);
        assert_eq!(BenchmarkStatus::from_counts(3, 0), BenchmarkStatus::Ok);
        assert_eq!(BenchmarkStatus::from_counts(0, 0), BenchmarkStatus::Ok);
    }

    #[test]
    fn test_rank_runs_by_speed_then_success_rate() {
        let base = BenchmarkRun::construction_failure("x", &[], "n/a");
        let run = |model: &str, speed: f64, success_rate: f64| BenchmarkRun {
            model: model.to_string(),
            speed,
            success_rate,
            ..base.clone()
        };
        let mut runs = vec![
            run("slow", 1.0, 1.0),
            run("fast-flaky", 5.0, 0.5),
            run("fast-solid", 5.0, 1.0),
        ];
        rank_runs(&mut runs);

        let order: Vec<(&str, usize)> = runs.iter().map(|r| (r.model.as_str(), r.priority)).collect();
        assert_eq!(order, vec![("fast-solid", 1), ("fast-flaky", 2), ("slow", 3)]);
    }
}
