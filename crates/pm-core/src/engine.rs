use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::aggregate::Aggregator;
use crate::backend::{Multiplier, Product};
use crate::config::{FailurePolicy, RunConfig};
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;
use crate::partition::Partition;
use crate::worker::{PartialStats, WorkerTask};

/// Multiplies matrices by splitting the output cells across OS threads.
///
/// Every call spawns a fresh set of scoped worker threads, one per chunk of
/// the flattened output, and joins all of them before reading the totals.
/// `a` and `b` are shared by reference; the output is split into disjoint
/// mutable views, so the only lock taken is the aggregator's.
#[derive(Debug, Clone)]
pub struct ThreadedMultiplier {
    config: RunConfig,
}

impl ThreadedMultiplier {
    pub fn new(config: RunConfig) -> Self {
        ThreadedMultiplier { config }
    }

    /// Shorthand for a default configuration with `workers` workers.
    pub fn with_workers(workers: usize) -> Self {
        Self::new(RunConfig::new(workers))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

impl Default for ThreadedMultiplier {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl Multiplier for ThreadedMultiplier {
    fn name(&self) -> &str {
        "threaded"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Product> {
        self.run_with(a, b, |task, aggregator| task.run(aggregator))
    }
}

impl ThreadedMultiplier {
    /// Drive one multiplication, with `work` as the body of every worker
    /// thread.
    fn run_with<F>(&self, a: &Matrix, b: &Matrix, work: F) -> Result<Product>
    where
        F: Fn(WorkerTask<'_>, &Aggregator) -> Result<PartialStats> + Sync,
    {
        self.config.validate()?;
        let dims = a.dims().matmul(&b.dims())?;
        let partition = Partition::split(dims.numel(), self.config.workers)?;

        tracing::info!(
            a = %a.dims(),
            b = %b.dims(),
            requested = partition.requested,
            workers = partition.effective,
            "starting multiplication"
        );

        let mut c = Matrix::zeros(dims);
        let aggregator = Aggregator::new();
        aggregator.reset();

        // Cancelled by the caller's token, or by the first failing worker
        // under fail-fast.
        let abort = self.config.cancel.child();
        let fail_fast = self.config.failure_policy == FailurePolicy::FailFast;

        let outcomes = thread::scope(|s| -> Result<Vec<Result<PartialStats>>> {
            let views = c.split_chunks_mut(&partition.chunks)?;
            let mut handles = Vec::with_capacity(views.len());

            for (id, view) in views.into_iter().enumerate() {
                let task = WorkerTask::new(id, a, b, view, &abort);
                let aggregator = &aggregator;
                let abort = &abort;
                let work = &work;
                let spawned = thread::Builder::new()
                    .name(format!("pm-worker-{}", id))
                    .spawn_scoped(s, move || {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| work(task, aggregator)))
                            .unwrap_or_else(|payload| {
                                Err(MatrixError::WorkerPanicked {
                                    worker: id,
                                    message: panic_message(payload.as_ref()),
                                })
                            });
                        if fail_fast && result.is_err() {
                            abort.cancel();
                        }
                        result
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Already-spawned workers are joined when the scope ends.
                        abort.cancel();
                        return Err(MatrixError::Spawn(e));
                    }
                }
            }

            Ok(handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle.join().unwrap_or_else(|payload| {
                        Err(MatrixError::WorkerPanicked {
                            worker: id,
                            message: panic_message(payload.as_ref()),
                        })
                    })
                })
                .collect())
        })?;

        if self.config.cancel.is_cancelled() {
            tracing::warn!("multiplication cancelled, discarding partial result");
            return Err(MatrixError::Cancelled);
        }

        let failed_workers = triage(outcomes, self.config.failure_policy)?;

        debug_assert_eq!(
            aggregator.merges(),
            partition.effective - failed_workers.len(),
            "every successful worker merges exactly once"
        );

        let product = Product {
            matrix: c,
            total_sum: aggregator.total_sum(),
            frobenius_norm: aggregator.frobenius_norm(),
            requested_workers: partition.requested,
            effective_workers: partition.effective,
            failed_workers,
        };

        if product.is_complete() {
            tracing::info!(
                total_sum = product.total_sum,
                frobenius_norm = product.frobenius_norm,
                "multiplication finished"
            );
        } else {
            tracing::warn!(
                failed = product.failed_workers.len(),
                "multiplication finished with failed workers, result is incomplete"
            );
        }
        Ok(product)
    }
}

/// Sort joined worker outcomes into the ids of failed workers.
///
/// Under fail-fast the first failure (by worker id) is returned as the run's
/// error. Workers that stopped with `Cancelled` were stopped by a sibling's
/// failure and are not failures themselves.
fn triage(outcomes: Vec<Result<PartialStats>>, policy: FailurePolicy) -> Result<Vec<usize>> {
    let mut failed_workers = Vec::new();
    let mut first_failure = None;

    for (id, outcome) in outcomes.into_iter().enumerate() {
        let err = match outcome {
            Ok(_) | Err(MatrixError::Cancelled) => continue,
            Err(err) => err,
        };
        tracing::error!(worker = id, error = %err, "worker failed");
        failed_workers.push(id);
        if first_failure.is_none() {
            first_failure = Some(match err {
                panicked @ MatrixError::WorkerPanicked { .. } => panicked,
                other => MatrixError::WorkerFailed {
                    worker: id,
                    source: Box::new(other),
                },
            });
        }
    }

    match (policy, first_failure) {
        (FailurePolicy::FailFast, Some(err)) => Err(err),
        _ => Ok(failed_workers),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancellationToken;
    use crate::serial::SerialMultiplier;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::time::{Duration, Instant};

    fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Matrix {
        let data = (0..rows * cols).map(|_| rng.gen_range(-10.0..10.0)).collect();
        Matrix::from_vec(rows, cols, data).unwrap()
    }

    fn square_pair() -> (Matrix, Matrix) {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        (a, b)
    }

    #[test]
    fn test_two_by_two_single_worker() {
        let (a, b) = square_pair();
        let p = ThreadedMultiplier::with_workers(1).multiply(&a, &b).unwrap();
        assert_eq!(p.matrix.to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
        assert_eq!(p.total_sum, 134.0);
        assert_relative_eq!(p.frobenius_norm, 5194.0f64.sqrt());
        assert_eq!(p.effective_workers, 1);
        assert!(p.is_complete());
    }

    #[test]
    fn test_two_by_two_one_worker_per_cell() {
        let (a, b) = square_pair();
        let one = ThreadedMultiplier::with_workers(1).multiply(&a, &b).unwrap();
        let four = ThreadedMultiplier::with_workers(4).multiply(&a, &b).unwrap();
        assert_eq!(four.effective_workers, 4);
        assert!(!four.was_clamped());
        assert_eq!(four.matrix, one.matrix);
        // Integer-valued cells sum exactly in any merge order.
        assert_eq!(four.total_sum, one.total_sum);
        assert_eq!(four.frobenius_norm, one.frobenius_norm);
    }

    #[test]
    fn test_one_by_one_clamps() {
        let a = Matrix::from_rows(&[[2.0]]).unwrap();
        let b = Matrix::from_rows(&[[3.0]]).unwrap();
        for workers in [1, 2, 7, 64] {
            let p = ThreadedMultiplier::with_workers(workers).multiply(&a, &b).unwrap();
            assert_eq!(p.matrix.as_slice(), &[6.0]);
            assert_eq!(p.total_sum, 6.0);
            assert_eq!(p.frobenius_norm, 6.0);
            assert_eq!(p.requested_workers, workers);
            assert_eq!(p.effective_workers, 1);
            assert_eq!(p.was_clamped(), workers > 1);
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let a = Matrix::new(2, 3).unwrap();
        let b = Matrix::new(2, 2).unwrap();
        assert!(matches!(
            ThreadedMultiplier::with_workers(2).multiply(&a, &b),
            Err(MatrixError::DimensionMismatch { m: 2, k: 3, k2: 2, n: 2 })
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (a, b) = square_pair();
        assert!(matches!(
            ThreadedMultiplier::with_workers(0).multiply(&a, &b),
            Err(MatrixError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_worker_count_does_not_change_product() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = random_matrix(&mut rng, 5, 4);
        let b = random_matrix(&mut rng, 4, 3);
        let reference = ThreadedMultiplier::with_workers(1).multiply(&a, &b).unwrap();

        for workers in 1..=15 {
            let p = ThreadedMultiplier::with_workers(workers).multiply(&a, &b).unwrap();
            assert_eq!(p.effective_workers, workers);
            // Bit-identical: each cell is summed in the same order regardless
            // of which worker computes it.
            assert_eq!(p.matrix, reference.matrix, "workers={}", workers);
            assert_relative_eq!(p.total_sum, reference.total_sum, epsilon = 1e-9);
            assert_relative_eq!(p.frobenius_norm, reference.frobenius_norm, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_matches_serial_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            let m = rng.gen_range(1..12);
            let k = rng.gen_range(1..12);
            let n = rng.gen_range(1..12);
            let workers = rng.gen_range(1..=m * n + 3);
            let a = random_matrix(&mut rng, m, k);
            let b = random_matrix(&mut rng, k, n);

            let serial = SerialMultiplier::new().multiply(&a, &b).unwrap();
            let threaded = ThreadedMultiplier::with_workers(workers).multiply(&a, &b).unwrap();

            assert_eq!(threaded.matrix, serial.matrix);
            assert_relative_eq!(threaded.total_sum, serial.total_sum, epsilon = 1e-9);
            assert_relative_eq!(
                threaded.frobenius_norm,
                serial.frobenius_norm,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_aggregates_match_product_contents() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = random_matrix(&mut rng, 9, 6);
        let b = random_matrix(&mut rng, 6, 8);
        let p = ThreadedMultiplier::with_workers(5).multiply(&a, &b).unwrap();
        assert_relative_eq!(p.total_sum, p.matrix.sum(), epsilon = 1e-9);
        assert_relative_eq!(p.frobenius_norm, p.matrix.frobenius_norm(), epsilon = 1e-9);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (a, b) = square_pair();
        let token = CancellationToken::new();
        token.cancel();
        let config = RunConfig::new(2).with_cancellation(token);
        let result = ThreadedMultiplier::new(config).multiply(&a, &b);
        assert!(matches!(result, Err(MatrixError::Cancelled)));
    }

    #[test]
    fn test_run_does_not_cancel_caller_token() {
        let (a, b) = square_pair();
        let token = CancellationToken::new();
        let multiplier = ThreadedMultiplier::new(RunConfig::new(3).with_cancellation(token.clone()));
        multiplier.multiply(&a, &b).unwrap();
        assert!(!token.is_cancelled());
        // The same configuration can be run again.
        let again = multiplier.multiply(&a, &b).unwrap();
        assert_eq!(again.total_sum, 134.0);
    }

    #[test]
    fn test_repeated_runs_do_not_share_totals() {
        let (a, b) = square_pair();
        let multiplier = ThreadedMultiplier::with_workers(2);
        let first = multiplier.multiply(&a, &b).unwrap();
        let second = multiplier.multiply(&a, &b).unwrap();
        assert_eq!(first.total_sum, 134.0);
        assert_eq!(second.total_sum, 134.0);
    }

    #[test]
    fn test_name() {
        assert_eq!(ThreadedMultiplier::default().name(), "threaded");
        assert_eq!(SerialMultiplier::new().name(), "serial");
    }

    /// Wait for the task's run to be cancelled, giving up after a few
    /// seconds so a broken abort path fails the test instead of hanging it.
    fn wait_for_cancel(task: &WorkerTask<'_>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !task.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_fail_fast_panic_stops_siblings() {
        let (a, b) = square_pair();
        let token = CancellationToken::new();
        let multiplier = ThreadedMultiplier::new(RunConfig::new(4).with_cancellation(token.clone()));
        let stopped = AtomicUsize::new(0);
        let merged = AtomicUsize::new(0);

        let result = multiplier.run_with(&a, &b, |task, aggregator| {
            if task.id() == 0 {
                panic!("worker zero gave up");
            }
            wait_for_cancel(&task);
            let outcome = task.run(aggregator);
            match &outcome {
                Err(MatrixError::Cancelled) => stopped.fetch_add(1, Ordering::SeqCst),
                _ => merged.fetch_add(1, Ordering::SeqCst),
            };
            outcome
        });

        match result {
            Err(MatrixError::WorkerPanicked { worker, message }) => {
                assert_eq!(worker, 0);
                assert_eq!(message, "worker zero gave up");
            }
            other => panic!("expected WorkerPanicked, got {:?}", other),
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 3);
        assert_eq!(merged.load(Ordering::SeqCst), 0);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_fail_fast_error_is_wrapped() {
        let (a, b) = square_pair();
        let token = CancellationToken::new();
        let multiplier = ThreadedMultiplier::new(RunConfig::new(3).with_cancellation(token.clone()));

        let result = multiplier.run_with(&a, &b, |task, aggregator| {
            if task.id() == 1 {
                return Err(MatrixError::InvalidArgument("bad chunk".to_string()));
            }
            wait_for_cancel(&task);
            task.run(aggregator)
        });

        match result {
            Err(MatrixError::WorkerFailed { worker, source }) => {
                assert_eq!(worker, 1);
                assert!(matches!(*source, MatrixError::InvalidArgument(_)));
            }
            other => panic!("expected WorkerFailed, got {:?}", other),
        }
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_isolate_reports_failed_workers() {
        let (a, b) = square_pair();
        let token = CancellationToken::new();
        let config = RunConfig::new(4)
            .with_failure_policy(FailurePolicy::Isolate)
            .with_cancellation(token.clone());

        let product = ThreadedMultiplier::new(config)
            .run_with(&a, &b, |task, aggregator| {
                if task.id() == 1 {
                    panic!("cell 1 is cursed");
                }
                task.run(aggregator)
            })
            .unwrap();

        assert!(!product.is_complete());
        assert_eq!(product.failed_workers, vec![1]);
        // The failed worker's cell keeps its initial value and is left out
        // of the totals.
        assert_eq!(product.matrix.as_slice(), &[19.0, 0.0, 43.0, 50.0]);
        assert_eq!(product.total_sum, 134.0 - 22.0);
        assert_relative_eq!(product.frobenius_norm, (5194.0f64 - 22.0 * 22.0).sqrt());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancelled_during_run() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = random_matrix(&mut rng, 16, 8);
        let b = random_matrix(&mut rng, 8, 16);
        let token = CancellationToken::new();
        let multiplier = ThreadedMultiplier::new(RunConfig::new(4).with_cancellation(token.clone()));
        let (started_tx, started_rx) = mpsc::channel();
        let started_tx = Mutex::new(started_tx);

        let result = thread::scope(|s| {
            let caller = &token;
            let canceller = s.spawn(move || {
                started_rx.recv().unwrap();
                caller.cancel();
            });
            let result = multiplier.run_with(&a, &b, |task, aggregator| {
                if task.id() == 0 {
                    started_tx.lock().unwrap().send(()).unwrap();
                }
                wait_for_cancel(&task);
                task.run(aggregator)
            });
            canceller.join().unwrap();
            result
        });

        assert!(matches!(result, Err(MatrixError::Cancelled)));
        assert!(token.is_cancelled());
    }

    fn stats(sum: f64) -> Result<PartialStats> {
        Ok(PartialStats {
            sum,
            sum_of_squares: sum * sum,
            cells: 1,
        })
    }

    #[test]
    fn test_triage_all_ok() {
        let failed = triage(vec![stats(1.0), stats(2.0)], FailurePolicy::FailFast).unwrap();
        assert!(failed.is_empty());
    }

    #[test]
    fn test_triage_fail_fast_returns_first_failure() {
        let outcomes = vec![
            stats(1.0),
            Err(MatrixError::Cancelled),
            Err(MatrixError::IndexOutOfRange {
                row: 9,
                col: 0,
                rows: 2,
                cols: 2,
            }),
            Err(MatrixError::WorkerPanicked {
                worker: 3,
                message: "boom".to_string(),
            }),
        ];
        match triage(outcomes, FailurePolicy::FailFast) {
            Err(MatrixError::WorkerFailed { worker, source }) => {
                assert_eq!(worker, 2);
                assert!(matches!(*source, MatrixError::IndexOutOfRange { row: 9, .. }));
            }
            other => panic!("expected WorkerFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_triage_fail_fast_keeps_panics() {
        let outcomes = vec![
            Err(MatrixError::WorkerPanicked {
                worker: 0,
                message: "boom".to_string(),
            }),
            stats(1.0),
        ];
        assert!(matches!(
            triage(outcomes, FailurePolicy::FailFast),
            Err(MatrixError::WorkerPanicked { worker: 0, .. })
        ));
    }

    #[test]
    fn test_triage_isolate_lists_failures() {
        let outcomes = vec![
            Err(MatrixError::InvalidArgument("bad".to_string())),
            stats(1.0),
            Err(MatrixError::WorkerPanicked {
                worker: 2,
                message: "boom".to_string(),
            }),
        ];
        let failed = triage(outcomes, FailurePolicy::Isolate).unwrap();
        assert_eq!(failed, vec![0, 2]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(17u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
