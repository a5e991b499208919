//! Graph traversal algorithms.
//!
//! Every traversal here is iterative with an explicit heap stack or queue, so deeply
//! nested functions cannot overflow the call stack.

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Successors};

/// Depth-first (preorder) iterator created by [`dfs`].
///
/// Successors are explored in edge insertion order.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let visited = vec![false; graph.node_count()];
        let stack = if start.index() < visited.len() {
            vec![start]
        } else {
            Vec::new()
        };
        DfsIterator {
            graph,
            stack,
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.stack.pop()?;
            if std::mem::replace(&mut self.visited[node.index()], true) {
                continue;
            }

            let successors: Vec<NodeId> = self.graph.successors(node).collect();
            for &succ in successors.iter().rev() {
                if !self.visited[succ.index()] {
                    self.stack.push(succ);
                }
            }
            return Some(node);
        }
    }
}

/// Returns a depth-first preorder iterator over the nodes reachable from `start`.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{algorithms::dfs, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// let c = graph.add_node(());
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(b, c, ())?;
///
/// assert_eq!(dfs(&graph, a).collect::<Vec<_>>(), vec![a, b, c]);
/// # Ok::<(), goscope::Error>(())
/// ```
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Breadth-first iterator created by [`bfs`].
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<(NodeId, usize)>,
    visited: Vec<bool>,
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    /// The node and its distance (in edges) from the start node.
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, distance) = self.queue.pop_front()?;
        for succ in self.graph.successors(node) {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.queue.push_back((succ, distance + 1));
            }
        }
        Some((node, distance))
    }
}

/// Returns a breadth-first iterator yielding each reachable node with its
/// shortest distance from `start`.
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    if start.index() < visited.len() {
        visited[start.index()] = true;
        queue.push_back((start, 0));
    }
    BfsIterator {
        graph,
        queue,
        visited,
    }
}

/// Walks the DFS tree from `start`, reporting every finished node and every edge that
/// targets a node still on the DFS stack.
fn depth_first_walk<G: Successors>(
    graph: &G,
    start: NodeId,
    mut on_finish: impl FnMut(NodeId),
    mut on_back_edge: impl FnMut(NodeId, NodeId),
) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    let node_count = graph.node_count();
    if start.index() >= node_count {
        return;
    }

    let mut marks = vec![Mark::New; node_count];
    // Each frame holds a node and its successors not yet explored (reversed so `pop`
    // yields them in insertion order).
    let mut stack: Vec<(NodeId, Vec<NodeId>)> = Vec::new();

    let open = |node: NodeId, marks: &mut Vec<Mark>| -> (NodeId, Vec<NodeId>) {
        marks[node.index()] = Mark::Open;
        let mut successors: Vec<NodeId> = graph.successors(node).collect();
        successors.reverse();
        (node, successors)
    };

    stack.push(open(start, &mut marks));
    while let Some((node, pending)) = stack.last_mut() {
        let node = *node;
        match pending.pop() {
            Some(succ) => match marks[succ.index()] {
                Mark::New => {
                    let frame = open(succ, &mut marks);
                    stack.push(frame);
                }
                Mark::Open => on_back_edge(node, succ),
                Mark::Done => {}
            },
            None => {
                marks[node.index()] = Mark::Done;
                on_finish(node);
                stack.pop();
            }
        }
    }
}

/// Computes the postorder of the nodes reachable from `start`.
///
/// A node appears after all nodes first reached through it. Backward data-flow problems
/// iterate in this order.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{algorithms::postorder, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// let c = graph.add_node(());
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(b, c, ())?;
///
/// assert_eq!(postorder(&graph, a), vec![c, b, a]);
/// # Ok::<(), goscope::Error>(())
/// ```
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(graph.node_count());
    depth_first_walk(graph, start, |node| order.push(node), |_, _| {});
    order
}

/// Computes the reverse postorder of the nodes reachable from `start`.
///
/// In an acyclic region every node precedes its successors, which is why forward
/// data-flow problems and the dominator computation iterate in this order.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}

/// Returns the edges `(source, target)` whose target is an open ancestor of the source
/// in a depth-first search from `start`.
///
/// This is the structural definition of a back edge and does not depend on any edge
/// labelling. On reducible graphs, which is all the CFG builder produces, the result
/// equals the set of edges whose target dominates their source.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{algorithms::back_edges, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let header = graph.add_node(());
/// let body = graph.add_node(());
/// graph.add_edge(header, body, ())?;
/// graph.add_edge(body, header, ())?;
///
/// assert_eq!(back_edges(&graph, header), vec![(body, header)]);
/// # Ok::<(), goscope::Error>(())
/// ```
pub fn back_edges<G: Successors>(graph: &G, start: NodeId) -> Vec<(NodeId, NodeId)> {
    let mut edges = Vec::new();
    depth_first_walk(graph, start, |_| {}, |from, to| edges.push((from, to)));
    edges.sort();
    edges
}

#[cfg(test)]
mod tests {
    use crate::utils::graph::{
        algorithms::traversal::{back_edges, bfs, dfs, postorder, reverse_postorder},
        DirectedGraph, NodeId,
    };

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn graph_from(nodes: usize, edges: &[(usize, usize)]) -> DirectedGraph<(), ()> {
        let mut graph = DirectedGraph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for &(a, b) in edges {
            graph.add_edge(n(a), n(b), ()).unwrap();
        }
        graph
    }

    #[test]
    fn test_dfs_diamond() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let order: Vec<NodeId> = dfs(&graph, n(0)).collect();
        assert_eq!(order, vec![n(0), n(1), n(3), n(2)]);
    }

    #[test]
    fn test_dfs_skips_unreachable() {
        let graph = graph_from(3, &[(0, 1)]);
        assert_eq!(dfs(&graph, n(0)).count(), 2);
        assert_eq!(dfs(&graph, n(7)).count(), 0);
    }

    #[test]
    fn test_bfs_distances() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let visited: Vec<(NodeId, usize)> = bfs(&graph, n(0)).collect();
        assert_eq!(visited[0], (n(0), 0));
        assert_eq!(visited.last(), Some(&(n(3), 2)));
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn test_postorder_children_first() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let order = postorder(&graph, n(0));
        assert_eq!(order, vec![n(3), n(1), n(2), n(0)]);
    }

    #[test]
    fn test_reverse_postorder_with_cycle() {
        // 0 -> 1 -> 2 -> 1, 1 -> 3
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let order = reverse_postorder(&graph, n(0));
        assert_eq!(order[0], n(0));
        assert_eq!(order[1], n(1));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_back_edges_loop() {
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        assert_eq!(back_edges(&graph, n(0)), vec![(n(2), n(1))]);
    }

    #[test]
    fn test_back_edges_self_loop_and_nested() {
        // outer header 1, inner header 2 with self loop, inner exit back to 1
        let graph = graph_from(5, &[(0, 1), (1, 2), (2, 2), (2, 3), (3, 1), (1, 4)]);
        assert_eq!(back_edges(&graph, n(0)), vec![(n(2), n(2)), (n(3), n(1))]);
    }

    #[test]
    fn test_back_edges_acyclic() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert!(back_edges(&graph, n(0)).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let edges: Vec<(usize, usize)> = (0..50_000).map(|i| (i, i + 1)).collect();
        let graph = graph_from(50_001, &edges);
        assert_eq!(postorder(&graph, n(0)).len(), 50_001);
    }
}
