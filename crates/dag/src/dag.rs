//! Vertex arena, ready-queue and the concurrent drain protocol.
//!
//! A [`Dag`] has two phases. During the build phase (`init`, `add_edge`,
//! `generate`) it is mutated through `&mut self` by a single thread. During
//! the drain phase any number of workers share `&Dag` and loop
//! [`Dag::wait_pop`] (or [`Dag::pop`]), run their work, then
//! [`Dag::consume`] the finished vertex.
//!
//! Locking is two-tiered: every vertex guards its own in-degree, and one
//! coarse lock guards the ready-queue together with the consumed count. The
//! coarse lock is paired with a condition variable that blocked consumers
//! wait on.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Dense index of a vertex, in `[0, total_count)`.
pub type VertexId = usize;

/// A single schedulable unit of work.
#[derive(Debug, Default)]
struct Vertex {
    /// Successors, in insertion order.
    out_edges: Vec<VertexId>,
    /// Number of predecessors not yet consumed.
    in_degree: Mutex<usize>,
}

/// Ready-queue and consumed count, always observed together.
#[derive(Debug, Default)]
struct ReadyState {
    queue: VecDeque<VertexId>,
    consumed: usize,
}

/// Directed acyclic graph of dependent work items with a concurrent
/// topological drain.
///
/// Vertices are stored in an arena indexed by [`VertexId`]; edges are plain
/// ids, so the structure owns no pointers between vertices. The caller is
/// responsible for acyclicity: vertices on a cycle never become ready and
/// blocked consumers wait for an exhaustion that never comes.
#[derive(Debug, Default)]
pub struct Dag {
    vertices: Vec<Vertex>,
    ready: Mutex<ReadyState>,
    ready_cv: Condvar,
    total: usize,
}

impl Dag {
    /// Create an empty DAG with no vertices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DAG with `size` unconnected vertices.
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        let mut dag = Self::new();
        dag.init(size);
        dag
    }

    /// Reset all state and allocate `max_size` fresh vertices.
    ///
    /// Every vertex starts with no out-edges and an in-degree of zero.
    pub fn init(&mut self, max_size: usize) {
        self.clear();
        self.vertices.resize_with(max_size, Vertex::default);
        self.total = max_size;
        self.ready.get_mut().consumed = 0;
        debug!(vertices = max_size, "Initialized DAG");
    }

    /// Record that `to` must run after `from`.
    ///
    /// Appends `to` to `from`'s successors and increments `to`'s in-degree.
    /// If either endpoint is out of range the edge is dropped.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) {
        let len = self.vertices.len();
        if from >= len || to >= len {
            warn!(
                from,
                to,
                vertices = len,
                "Dropping edge with out-of-range endpoint"
            );
            return;
        }

        self.vertices[from].out_edges.push(to);
        *self.vertices[to].in_degree.get_mut() += 1;
        trace!(from, to, "Added edge");
    }

    /// Seed the ready-queue with every vertex whose in-degree is zero.
    ///
    /// Vertices are enqueued in ascending id order. Call exactly once, after
    /// the last [`Dag::add_edge`] and before any consumer starts.
    pub fn generate(&mut self) {
        let ready = self.ready.get_mut();
        for (id, vertex) in self.vertices.iter_mut().enumerate() {
            if *vertex.in_degree.get_mut() == 0 {
                ready.queue.push_back(id);
            }
        }
        debug!(
            vertices = self.total,
            ready = ready.queue.len(),
            "Generated ready queue"
        );
    }

    /// Take the oldest ready vertex without blocking.
    ///
    /// Returns `None` when the ready-queue is currently empty, whether or not
    /// the DAG is exhausted.
    #[must_use]
    pub fn pop(&self) -> Option<VertexId> {
        self.ready.lock().queue.pop_front()
    }

    /// Take the oldest ready vertex, blocking until one is available.
    ///
    /// Returns `None` once every vertex has been consumed; that is the signal
    /// for a worker to stop.
    #[must_use]
    pub fn wait_pop(&self) -> Option<VertexId> {
        let mut ready = self.ready.lock();
        loop {
            if let Some(id) = ready.queue.pop_front() {
                return Some(id);
            }
            if ready.consumed >= self.total {
                return None;
            }
            // Spurious wakeups and lost races both land back here.
            self.ready_cv.wait(&mut ready);
        }
    }

    /// Report that the work for `id` has finished.
    ///
    /// Decrements the in-degree of each successor. A successor whose
    /// in-degree reaches zero is enqueued and one waiter is woken. When the
    /// last vertex is consumed every waiter is woken so that each of them
    /// observes exhaustion.
    ///
    /// Must be called at most once per id, and only for an id obtained from
    /// [`Dag::pop`] or [`Dag::wait_pop`]. Violations corrupt the in-degree
    /// accounting and are not detected.
    pub fn consume(&self, id: VertexId) {
        let Some(vertex) = self.vertices.get(id) else {
            warn!(
                vertex = id,
                vertices = self.total,
                "Ignoring consume of unknown vertex"
            );
            return;
        };

        for &succ in &vertex.out_edges {
            let became_ready = {
                let mut in_degree = self.vertices[succ].in_degree.lock();
                match in_degree.checked_sub(1) {
                    Some(remaining) => {
                        *in_degree = remaining;
                        remaining == 0
                    }
                    None => false,
                }
            };

            if became_ready {
                let mut ready = self.ready.lock();
                ready.queue.push_back(succ);
                self.ready_cv.notify_one();
                trace!(vertex = succ, queued = ready.queue.len(), "Vertex ready");
            }
        }

        let mut ready = self.ready.lock();
        ready.consumed += 1;
        debug_assert!(
            ready.consumed <= self.total,
            "consumed more vertices than the DAG holds"
        );
        trace!(
            vertex = id,
            consumed = ready.consumed,
            total = self.total,
            "Consumed vertex"
        );
        if ready.consumed >= self.total {
            self.ready_cv.notify_all();
            debug!(vertices = self.total, "DAG exhausted");
        }
    }

    /// Release every vertex and empty the ready-queue.
    ///
    /// The consumed and total counts are re-established by [`Dag::init`].
    pub fn clear(&mut self) {
        self.vertices = Vec::new();
        self.ready.get_mut().queue.clear();
    }

    /// Number of vertices allocated by the last [`Dag::init`].
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Number of vertices consumed so far.
    #[must_use]
    pub fn consumed_count(&self) -> usize {
        self.ready.lock().consumed
    }

    /// Whether every vertex has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.ready.lock().consumed >= self.total
    }

    /// Number of vertices currently waiting in the ready-queue.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.lock().queue.len()
    }

    /// Remaining unconsumed predecessors of `id`.
    #[must_use]
    pub fn in_degree(&self, id: VertexId) -> Option<usize> {
        self.vertices.get(id).map(|v| *v.in_degree.lock())
    }

    /// Successors of `id`, in insertion order.
    #[must_use]
    pub fn out_edges(&self, id: VertexId) -> Option<&[VertexId]> {
        self.vertices.get(id).map(|v| v.out_edges.as_slice())
    }

    /// Total number of edges recorded.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(|v| v.out_edges.len()).sum()
    }

    /// Dump the edges of `id` at trace level.
    pub fn trace_vertex(&self, id: VertexId) {
        let Some(vertex) = self.vertices.get(id) else {
            return;
        };
        let in_degree = *vertex.in_degree.lock();
        for &edge in &vertex.out_edges {
            trace!(vertex = id, in_degree, edge, "Vertex edge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// 0 -> 2, 1 -> 2, 2 -> 3
    fn fan_in_chain() -> Dag {
        let mut dag = Dag::with_size(4);
        dag.add_edge(0, 2);
        dag.add_edge(1, 2);
        dag.add_edge(2, 3);
        dag.generate();
        dag
    }

    /// 0 -> {1, 2} -> 3
    fn diamond() -> Dag {
        let mut dag = Dag::with_size(4);
        dag.add_edge(0, 1);
        dag.add_edge(0, 2);
        dag.add_edge(1, 3);
        dag.add_edge(2, 3);
        dag.generate();
        dag
    }

    #[test]
    fn test_new_dag_is_empty() {
        let dag = Dag::new();
        assert_eq!(dag.total_count(), 0);
        assert_eq!(dag.edge_count(), 0);
        assert!(dag.is_exhausted());
    }

    #[test]
    fn test_init_allocates_unconnected_vertices() {
        let mut dag = Dag::new();
        dag.init(3);

        assert_eq!(dag.total_count(), 3);
        for id in 0..3 {
            assert_eq!(dag.in_degree(id), Some(0));
            assert_eq!(dag.out_edges(id), Some(&[][..]));
        }
        assert_eq!(dag.in_degree(3), None);
    }

    #[test]
    fn test_add_edge_updates_degree_and_successors() {
        let mut dag = Dag::with_size(3);
        dag.add_edge(0, 2);
        dag.add_edge(1, 2);

        assert_eq!(dag.in_degree(2), Some(2));
        assert_eq!(dag.out_edges(0), Some(&[2][..]));
        assert_eq!(dag.out_edges(1), Some(&[2][..]));
        assert_eq!(dag.edge_count(), 2);
    }

    #[test]
    fn test_out_of_range_edge_is_dropped() {
        let mut dag = Dag::with_size(4);
        dag.add_edge(5, 1);
        dag.add_edge(1, 7);

        assert_eq!(dag.in_degree(1), Some(0));
        assert_eq!(dag.out_edges(1), Some(&[][..]));
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn test_generate_seeds_roots_in_id_order() {
        let dag = fan_in_chain();
        assert_eq!(dag.ready_len(), 2);
        assert_eq!(dag.pop(), Some(0));
        assert_eq!(dag.pop(), Some(1));
        assert_eq!(dag.pop(), None);
    }

    #[test]
    fn test_fan_in_chain_scenario() {
        let dag = fan_in_chain();

        assert_eq!(dag.pop(), Some(0));
        assert_eq!(dag.pop(), Some(1));

        dag.consume(0);
        assert_eq!(dag.in_degree(2), Some(1));
        assert_eq!(dag.pop(), None);

        dag.consume(1);
        assert_eq!(dag.in_degree(2), Some(0));
        assert_eq!(dag.pop(), Some(2));

        dag.consume(2);
        assert_eq!(dag.pop(), Some(3));
        assert!(!dag.is_exhausted());

        dag.consume(3);
        assert_eq!(dag.consumed_count(), 4);
        assert!(dag.is_exhausted());
        assert_eq!(dag.wait_pop(), None);
    }

    #[test]
    fn test_pop_on_empty_queue_returns_none() {
        let dag = fan_in_chain();
        let _ = dag.pop();
        let _ = dag.pop();
        // Nothing consumed yet, so the graph is not exhausted, only empty.
        assert_eq!(dag.pop(), None);
        assert!(!dag.is_exhausted());
    }

    #[test]
    fn test_wait_pop_on_empty_dag_does_not_block() {
        let mut dag = Dag::with_size(0);
        dag.generate();
        assert_eq!(dag.wait_pop(), None);
    }

    #[test]
    fn test_sequential_drain_visits_every_vertex_once() {
        let dag = diamond();
        let mut seen = Vec::new();
        while let Some(id) = dag.wait_pop() {
            seen.push(id);
            dag.consume(id);
        }

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(dag.consumed_count(), dag.total_count());
    }

    #[test]
    fn test_duplicate_edges_count_twice() {
        let mut dag = Dag::with_size(2);
        dag.add_edge(0, 1);
        dag.add_edge(0, 1);
        dag.generate();

        assert_eq!(dag.in_degree(1), Some(2));
        let root = dag.pop().unwrap();
        dag.consume(root);
        assert_eq!(dag.in_degree(1), Some(0));
        assert_eq!(dag.pop(), Some(1));
        assert_eq!(dag.pop(), None);
    }

    #[test]
    fn test_consume_unknown_vertex_is_ignored() {
        let dag = diamond();
        dag.consume(42);
        assert_eq!(dag.consumed_count(), 0);
    }

    #[test]
    fn test_init_resets_previous_graph() {
        let mut dag = diamond();
        while let Some(id) = dag.wait_pop() {
            dag.consume(id);
        }
        assert!(dag.is_exhausted());

        dag.init(2);
        assert_eq!(dag.total_count(), 2);
        assert_eq!(dag.consumed_count(), 0);
        assert_eq!(dag.ready_len(), 0);
        assert_eq!(dag.edge_count(), 0);
        assert!(!dag.is_exhausted());
    }

    #[test]
    fn test_add_edge_after_clear_is_dropped() {
        let mut dag = Dag::with_size(4);
        dag.clear();
        dag.add_edge(0, 1);

        assert_eq!(dag.edge_count(), 0);
        assert_eq!(dag.in_degree(0), None);
    }

    #[test]
    fn test_pop_during_concurrent_consume_never_blocks() {
        // 0 -> 1..=64, so consuming 0 walks many successors.
        let mut dag = Dag::with_size(65);
        for succ in 1..65 {
            dag.add_edge(0, succ);
        }
        dag.generate();
        assert_eq!(dag.pop(), Some(0));

        let polls = AtomicUsize::new(0);
        let popped = Mutex::new(Vec::new());
        thread::scope(|s| {
            s.spawn(|| dag.consume(0));
            s.spawn(|| {
                while !dag.is_exhausted() {
                    polls.fetch_add(1, Ordering::SeqCst);
                    if let Some(id) = dag.pop() {
                        popped.lock().push(id);
                        dag.consume(id);
                    } else {
                        thread::yield_now();
                    }
                }
            });
        });

        assert!(polls.load(Ordering::SeqCst) > 0);
        let unique: HashSet<_> = popped.lock().iter().copied().collect();
        assert_eq!(unique.len(), 64);
        assert!(dag.is_exhausted());
    }

    #[test]
    fn test_clear_releases_vertices_and_queue() {
        let mut dag = diamond();
        dag.clear();
        assert_eq!(dag.ready_len(), 0);
        assert_eq!(dag.in_degree(0), None);
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn test_trace_vertex_ignores_unknown_id() {
        let dag = diamond();
        dag.trace_vertex(0);
        dag.trace_vertex(99);
    }

    #[test]
    fn test_blocked_waiter_receives_new_work() {
        let mut dag = Dag::with_size(2);
        dag.add_edge(0, 1);
        dag.generate();
        assert_eq!(dag.pop(), Some(0));

        thread::scope(|s| {
            let waiter = s.spawn(|| dag.wait_pop());
            thread::sleep(Duration::from_millis(50));
            dag.consume(0);
            assert_eq!(waiter.join().unwrap(), Some(1));
        });
    }

    #[test]
    fn test_exhaustion_wakes_every_waiter() {
        let mut dag = Dag::with_size(1);
        dag.generate();
        assert_eq!(dag.pop(), Some(0));

        thread::scope(|s| {
            let waiters: Vec<_> = (0..4).map(|_| s.spawn(|| dag.wait_pop())).collect();
            thread::sleep(Duration::from_millis(50));
            dag.consume(0);
            for waiter in waiters {
                assert_eq!(waiter.join().unwrap(), None);
            }
        });
    }

    #[test]
    fn test_concurrent_diamond_drain_has_no_loss_or_duplication() {
        for _ in 0..200 {
            let dag = diamond();
            let pops = AtomicUsize::new(0);
            let seen = Mutex::new(Vec::new());

            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        while let Some(id) = dag.wait_pop() {
                            pops.fetch_add(1, Ordering::SeqCst);
                            seen.lock().push(id);
                            dag.consume(id);
                        }
                    });
                }
            });

            assert_eq!(pops.load(Ordering::SeqCst), 4);
            let unique: HashSet<_> = seen.lock().iter().copied().collect();
            assert_eq!(unique.len(), 4);
            assert!(dag.is_exhausted());
        }
    }

    #[test]
    fn test_dag_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dag>();
    }
}
