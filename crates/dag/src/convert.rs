//! Import from petgraph.

use crate::Dag;
use petgraph::graph::DiGraph;
use tracing::debug;

impl Dag {
    /// Build a ready-to-drain DAG from a petgraph directed graph.
    ///
    /// Vertex ids are the graph's node indices and every graph edge becomes a
    /// dependency edge. Node and edge weights are ignored. The graph must be
    /// acyclic.
    #[must_use]
    pub fn from_graph<N, E>(graph: &DiGraph<N, E>) -> Self {
        let mut dag = Self::with_size(graph.node_count());
        for edge in graph.raw_edges() {
            dag.add_edge(edge.source().index(), edge.target().index());
        }
        dag.generate();
        debug!(
            vertices = graph.node_count(),
            edges = graph.edge_count(),
            "Imported DAG from graph"
        );
        dag
    }
}

impl<N, E> From<&DiGraph<N, E>> for Dag {
    fn from(graph: &DiGraph<N, E>) -> Self {
        Self::from_graph(graph)
    }
}
