//! Concurrent topological-order scheduling over a DAG of dependent work items.
//!
//! This crate provides the dependency-driven core of a parallel transaction or
//! task processor. Vertices are units of work identified by a dense integer
//! [`VertexId`]; edges are "must happen after" constraints computed upstream.
//! Worker threads pull ready vertices, run their payload outside any lock, and
//! report completion so that successors become ready for other workers without
//! a barrier between dependency levels.
//!
//! # Key Types
//!
//! - [`Dag`]: the vertex arena, ready-queue and drain protocol
//! - [`ConflictGraph`]: builds a [`Dag`] from per-item conflict keys
//! - [`ConflictKeys`]: trait that items must implement to be ordered by conflicts
//!
//! # Example
//!
//! ```
//! use paradag_dag::Dag;
//!
//! let mut dag = Dag::new();
//! dag.init(4);
//! dag.add_edge(0, 2);
//! dag.add_edge(1, 2);
//! dag.add_edge(2, 3);
//! dag.generate();
//!
//! let mut order = Vec::new();
//! while let Some(id) = dag.wait_pop() {
//!     order.push(id);
//!     dag.consume(id);
//! }
//! assert_eq!(order, vec![0, 1, 2, 3]);
//! ```

mod conflict;
mod convert;
mod dag;

pub use conflict::{ConflictGraph, ConflictKeys};
pub use dag::{Dag, VertexId};
