//! Executor configuration

use crate::error::{ExecutorError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::thread;

/// Upper bound on the number of worker threads.
pub const MAX_WORKERS: usize = 1024;

/// How workers wait for ready vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitMode {
    /// Block on the DAG's condition variable until work or exhaustion.
    #[default]
    Blocking,
    /// Poll the ready-queue and yield the thread while it is empty.
    Polling,
}

/// Configuration for a DAG executor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum parallel workers (0 = available parallelism)
    pub max_parallel: usize,
    /// Wait strategy used by workers
    pub mode: WaitMode,
}

impl ExecutorConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed, contains
    /// unknown fields, or fails [`ExecutorConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ExecutorError::configuration(format!("Invalid executor config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum number of workers.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Set the wait strategy.
    #[must_use]
    pub fn with_mode(mut self, mode: WaitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_parallel` exceeds [`MAX_WORKERS`].
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel > MAX_WORKERS {
            return Err(ExecutorError::configuration(format!(
                "max_parallel {} exceeds the limit of {MAX_WORKERS}",
                self.max_parallel
            )));
        }
        Ok(())
    }

    /// Effective number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.max_parallel > 0 {
            return self.max_parallel;
        }
        thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(MAX_WORKERS)
    }
}
