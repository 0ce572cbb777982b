//! Conflict-key graph builder.
//!
//! Items (typically transactions) declare the keys they touch. Two items that
//! share a key must run in submission order, so each item depends on the most
//! recent earlier item that touched each of its keys. Ordering edges by
//! submission index keeps the resulting graph acyclic by construction.

use crate::{Dag, VertexId};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

/// Trait for items that can be ordered by the keys they conflict on.
///
/// Implement this for your transaction or task type so it can be fed to
/// [`ConflictGraph::build`].
pub trait ConflictKeys {
    /// Key type identifying a shared resource (an account, a storage slot,
    /// a file path, ...).
    type Key: Hash + Eq + Clone;

    /// Returns the keys this item touches.
    fn conflict_keys(&self) -> impl Iterator<Item = &Self::Key>;
}

/// Incremental builder that turns per-item conflict keys into a [`Dag`].
#[derive(Debug, Clone)]
pub struct ConflictGraph<K> {
    /// Most recent item to touch each key.
    last_touch: HashMap<K, VertexId>,
    edges: Vec<(VertexId, VertexId)>,
    len: usize,
}

impl<K: Hash + Eq + Clone> ConflictGraph<K> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_touch: HashMap::new(),
            edges: Vec::new(),
            len: 0,
        }
    }

    /// Append the next item, given the keys it touches, and return its id.
    ///
    /// The new item depends on the latest earlier item for each key. Several
    /// shared keys with the same predecessor produce a single edge.
    pub fn push<'a>(&mut self, keys: impl IntoIterator<Item = &'a K>) -> VertexId
    where
        K: 'a,
    {
        let id = self.len;
        self.len += 1;

        let mut preds = HashSet::new();
        for key in keys {
            if let Some(prev) = self.last_touch.insert(key.clone(), id)
                && prev != id
                && preds.insert(prev)
            {
                self.edges.push((prev, id));
            }
        }
        id
    }

    /// Number of items pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no items have been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dependency edges collected so far, as `(before, after)` pairs.
    #[must_use]
    pub fn edges(&self) -> &[(VertexId, VertexId)] {
        &self.edges
    }

    /// Build and generate the DAG, ready to drain.
    #[must_use]
    pub fn into_dag(self) -> Dag {
        let mut dag = Dag::with_size(self.len);
        for &(from, to) in &self.edges {
            dag.add_edge(from, to);
        }
        dag.generate();
        debug!(
            items = self.len,
            edges = self.edges.len(),
            keys = self.last_touch.len(),
            "Built conflict DAG"
        );
        dag
    }

    /// Build a ready-to-drain DAG from items in submission order.
    ///
    /// Vertex `i` of the result corresponds to `items[i]`.
    #[must_use]
    pub fn build<T>(items: &[T]) -> Dag
    where
        T: ConflictKeys<Key = K>,
    {
        let mut builder = Self::new();
        for item in items {
            builder.push(item.conflict_keys());
        }
        builder.into_dag()
    }
}

impl<K: Hash + Eq + Clone> Default for ConflictGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}
