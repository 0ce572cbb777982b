//! Worker pool that drains a [`Dag`] to exhaustion.
//!
//! Each worker loops: take a ready vertex, run the caller's work for it
//! outside any DAG lock, then consume it so its successors become ready.
//! Workers stop when the DAG reports exhaustion.
//!
//! The DAG has no cancellation of its own, so a failure cannot simply stop
//! the pool: waiters would be stranded on vertices that never become ready.
//! Instead the first failure is recorded and every later vertex is consumed
//! without running its work, which drains the graph quickly and lets every
//! worker observe exhaustion.

use crate::config::{ExecutorConfig, WaitMode};
use crate::error::{ExecutorError, Result};
use paradag_dag::{Dag, VertexId};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, trace, warn};

/// Outcome of a successful drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Number of vertices whose work ran
    pub processed: usize,
    /// Number of worker threads used
    pub workers: usize,
}

/// Drains a DAG with a pool of scoped worker threads.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The executor's configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `work` for every vertex of `dag` in dependency order.
    ///
    /// `dag` must already be generated. Independent vertices run in parallel
    /// on up to [`ExecutorConfig::worker_count`] threads; a vertex only runs
    /// after all of its predecessors' work has finished.
    ///
    /// # Errors
    ///
    /// Returns the first [`ExecutorError::Task`] or [`ExecutorError::Panicked`]
    /// raised by `work`. The DAG is still drained to exhaustion before
    /// returning, but no work starts once a failure has been observed. Work
    /// already in progress on other workers runs to completion.
    pub fn run<F, E>(&self, dag: &Dag, work: F) -> Result<ExecutionSummary>
    where
        F: Fn(VertexId) -> std::result::Result<(), E> + Sync,
        E: fmt::Display,
    {
        let workers = self.config.worker_count();
        let drain = Drain {
            dag,
            work: &work,
            mode: self.config.mode,
            processed: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            failure: Mutex::new(None),
        };

        debug!(
            workers,
            vertices = dag.total_count(),
            mode = ?self.config.mode,
            "Starting DAG drain"
        );

        thread::scope(|s| {
            let drain = &drain;
            for worker in 0..workers {
                s.spawn(move || drain.worker_loop(worker));
            }
        });

        let processed = drain.processed.into_inner();
        if let Some(err) = drain.failure.into_inner() {
            warn!(processed, error = %err, "DAG drain halted");
            return Err(err);
        }

        debug!(processed, workers, "DAG drain complete");
        Ok(ExecutionSummary { processed, workers })
    }
}

/// State shared by the workers of one [`Executor::run`].
struct Drain<'a, F> {
    dag: &'a Dag,
    work: &'a F,
    mode: WaitMode,
    processed: AtomicUsize,
    aborted: AtomicBool,
    failure: Mutex<Option<ExecutorError>>,
}

impl<F, E> Drain<'_, F>
where
    F: Fn(VertexId) -> std::result::Result<(), E> + Sync,
    E: fmt::Display,
{
    fn worker_loop(&self, worker: usize) {
        trace!(worker, "Worker started");
        let mut handled = 0usize;
        while let Some(id) = self.next_ready() {
            if !self.aborted.load(Ordering::Acquire) {
                self.execute(id);
            }
            self.dag.consume(id);
            handled += 1;
        }
        trace!(worker, handled, "Worker finished");
    }

    fn next_ready(&self) -> Option<VertexId> {
        match self.mode {
            WaitMode::Blocking => self.dag.wait_pop(),
            WaitMode::Polling => loop {
                if let Some(id) = self.dag.pop() {
                    return Some(id);
                }
                if self.dag.is_exhausted() {
                    return None;
                }
                thread::yield_now();
            },
        }
    }

    fn execute(&self, id: VertexId) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.work)(id)));
        let err = match outcome {
            Ok(Ok(())) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => ExecutorError::task(id, e.to_string()),
            Err(payload) => ExecutorError::panicked(id, panic_message(payload.as_ref())),
        };

        warn!(vertex = id, error = %err, "Work failed, skipping remaining vertices");
        self.aborted.store(true, Ordering::Release);
        self.failure.lock().get_or_insert(err);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
