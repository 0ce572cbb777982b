//! Error types for DAG execution

use paradag_dag::VertexId;
use thiserror::Error;

/// Errors that can occur while configuring or running an executor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Invalid executor configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration problem
        message: String,
    },

    /// The work function returned an error for a vertex
    #[error("Work for vertex {vertex} failed: {message}")]
    Task {
        /// Vertex whose work failed
        vertex: VertexId,
        /// Error message reported by the work function
        message: String,
    },

    /// The work function panicked for a vertex
    #[error("Work for vertex {vertex} panicked: {message}")]
    Panicked {
        /// Vertex whose work panicked
        vertex: VertexId,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl ExecutorError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a task failure error
    #[must_use]
    pub fn task(vertex: VertexId, message: impl Into<String>) -> Self {
        Self::Task {
            vertex,
            message: message.into(),
        }
    }

    /// Create a task panic error
    #[must_use]
    pub fn panicked(vertex: VertexId, message: impl Into<String>) -> Self {
        Self::Panicked {
            vertex,
            message: message.into(),
        }
    }

    /// Vertex the error is attributed to, if any
    #[must_use]
    pub fn vertex(&self) -> Option<VertexId> {
        match self {
            Self::Configuration { .. } => None,
            Self::Task { vertex, .. } | Self::Panicked { vertex, .. } => Some(*vertex),
        }
    }
}

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;
