use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MatrixError, Result};

/// What a run does when one of its workers fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Cancel the remaining workers and return the first failure.
    #[default]
    FailFast,
    /// Log the failure, let the other workers finish, and report the failed
    /// worker ids on the returned product. The product is then incomplete.
    Isolate,
}

/// A shared flag that asks running workers to stop.
///
/// Clones share the same flag. A token made with [`CancellationToken::child`]
/// is cancelled when any of its ancestors is, but cancelling the child does
/// not reach back up.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.flag));
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self.ancestors.iter().any(|f| f.load(Ordering::Acquire))
    }
}

/// Configuration for one threaded multiplication run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Requested number of workers. May be reduced to the number of output
    /// cells.
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    /// Token polled by every worker before each output cell.
    pub cancel: CancellationToken,
}

impl RunConfig {
    pub fn new(workers: usize) -> Self {
        RunConfig {
            workers,
            failure_policy: FailurePolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// # Errors
    /// Returns `InvalidArgument` if `workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(MatrixError::InvalidArgument(
                "number of workers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    /// One worker per available CPU, falling back to a single worker.
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }
}
