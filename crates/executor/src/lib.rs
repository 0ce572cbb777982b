//! Worker pool that drains a [`paradag_dag::Dag`] in dependency order.
//!
//! The DAG crate only schedules; it never spawns threads or runs payloads.
//! This crate supplies the missing collaborator: a fixed pool of scoped
//! threads, each looping take-ready → run work → consume until the DAG is
//! exhausted.
//!
//! # Example
//!
//! ```
//! use paradag_dag::Dag;
//! use paradag_executor::{Executor, ExecutorConfig};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let mut dag = Dag::with_size(3);
//! dag.add_edge(0, 2);
//! dag.add_edge(1, 2);
//! dag.generate();
//!
//! let ran = AtomicUsize::new(0);
//! let executor = Executor::new(ExecutorConfig::default().with_max_parallel(2))?;
//! let summary = executor.run(&dag, |_id| {
//!     ran.fetch_add(1, Ordering::SeqCst);
//!     Ok::<(), std::convert::Infallible>(())
//! })?;
//!
//! assert_eq!(summary.processed, 3);
//! assert_eq!(ran.load(Ordering::SeqCst), 3);
//! # Ok::<(), paradag_executor::ExecutorError>(())
//! ```

mod config;
mod error;
mod executor;

pub use config::{ExecutorConfig, MAX_WORKERS, WaitMode};
pub use error::{ExecutorError, Result};
pub use executor::{ExecutionSummary, Executor};
