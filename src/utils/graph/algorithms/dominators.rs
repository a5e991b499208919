//! Dominator tree and dominance frontier computation.
//!
//! A node `d` **dominates** `n` if every path from the entry to `n` passes through `d`.
//! The **immediate dominator** `idom(n)` is the strict dominator of `n` that every other
//! strict dominator of `n` also dominates; making it the parent of `n` yields the
//! dominator tree rooted at the entry.
//!
//! # Algorithm
//!
//! Dominance sets are computed by the classic iterative data-flow formulation over the
//! reverse postorder of the reachable nodes:
//!
//! ```text
//! Dom(entry) = {entry}
//! Dom(n)     = {n} ∪ ⋂ Dom(p)  for p ∈ pred(n)
//! ```
//!
//! starting from `Dom(n) = N` for every other node. The sets shrink monotonically in a
//! finite lattice, so the loop terminates; for the reducible graphs produced by the CFG
//! builder it converges in two or three passes. Each set is a [`BitSet`], and the
//! immediate dominator is read off the chain property of dominance sets.
//!
//! Nodes that are not reachable from the entry have an empty dominance set, no
//! immediate dominator and no place in the tree.

use std::collections::BTreeSet;

use crate::utils::{
    graph::{algorithms::reverse_postorder, NodeId, Predecessors, Successors},
    BitSet,
};

/// Result of dominator computation.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// // entry -> a -> b
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(a, b, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// assert_eq!(tree.children(entry), &[a]);
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
    /// The entry (root) node of the tree
    entry: NodeId,
    /// Immediate dominator per node; `None` for the entry and unreachable nodes
    idom: Vec<Option<NodeId>>,
    /// Dominance set per node (empty for unreachable nodes)
    dom_sets: Vec<BitSet>,
    /// Tree children per node, in ascending id order
    children: Vec<Vec<NodeId>>,
    /// Passes needed to reach the fixed point
    iterations: usize,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the number of nodes of the analysed graph.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    /// Returns the immediate dominator of `node`.
    ///
    /// `None` for the entry, for nodes unreachable from the entry and for ids outside the
    /// graph.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.dom_sets
            .get(node.index())
            .is_some_and(|set| !set.is_empty())
    }

    /// Checks if `a` dominates `b`. Every reachable node dominates itself.
    ///
    /// O(1): a membership test in the dominance set of `b`.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dom_sets
            .get(b.index())
            .is_some_and(|set| set.contains(a.index()))
    }

    /// Checks if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the dominance set `Dom(node)`, as a bit set over node indices.
    ///
    /// # Panics
    ///
    /// Panics if `node` is outside the graph.
    #[must_use]
    pub fn dominance_set(&self, node: NodeId) -> &BitSet {
        &self.dom_sets[node.index()]
    }

    /// Returns the dominators of `node`, walking the idom chain from `node` up to the
    /// entry (both included).
    pub fn dominators(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.is_reachable(node).then_some(node);
        std::iter::successors(start, |&current| self.immediate_dominator(current))
    }

    /// Returns the depth of `node` in the dominator tree; the entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns the tree children of `node` (nodes whose immediate dominator it is), in
    /// ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of passes the fixed-point loop needed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Computes the dominator tree of the nodes reachable from `entry`.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// //      entry
/// //      /   \
/// //     a     b
/// //      \   /
/// //       exit
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// let exit = graph.add_node("exit");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(entry, b, ())?;
/// graph.add_edge(a, exit, ())?;
/// graph.add_edge(b, exit, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// assert!(!tree.strictly_dominates(a, exit));
/// assert_eq!(tree.immediate_dominator(exit), Some(entry));
/// # Ok::<(), goscope::Error>(())
/// ```
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    if entry.index() >= node_count {
        return DominatorTree {
            entry,
            idom: vec![None; node_count],
            dom_sets: vec![BitSet::new(node_count); node_count],
            children: vec![Vec::new(); node_count],
            iterations: 0,
        };
    }

    let rpo = reverse_postorder(graph, entry);
    let mut reachable = BitSet::new(node_count);
    for &node in &rpo {
        reachable.insert(node.index());
    }

    let mut dom_sets: Vec<BitSet> = (0..node_count)
        .map(|idx| {
            if reachable.contains(idx) {
                reachable.clone()
            } else {
                BitSet::new(node_count)
            }
        })
        .collect();
    dom_sets[entry.index()] = BitSet::from_indices(node_count, [entry.index()]);

    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = false;

        for &node in rpo.iter().filter(|&&n| n != entry) {
            let mut next = reachable.clone();
            for pred in graph.predecessors(node) {
                if reachable.contains(pred.index()) {
                    next.intersect_with(&dom_sets[pred.index()]);
                }
            }
            next.insert(node.index());

            if next != dom_sets[node.index()] {
                dom_sets[node.index()] = next;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    // Dominance sets along a path form a chain, so the strict dominator with the
    // largest set is the one dominated by all others: the immediate dominator.
    let mut idom = vec![None; node_count];
    let mut children = vec![Vec::new(); node_count];
    for &node in rpo.iter().filter(|&&n| n != entry) {
        let dominators = &dom_sets[node.index()];
        let parent = dominators
            .iter()
            .filter(|&d| d != node.index())
            .max_by_key(|&d| dom_sets[d].count())
            .map(NodeId::new);
        idom[node.index()] = parent;
        if let Some(parent) = parent {
            children[parent.index()].push(node);
        }
    }
    for list in &mut children {
        list.sort();
    }

    DominatorTree {
        entry,
        idom,
        dom_sets,
        children,
        iterations,
    }
}

/// Computes the dominance frontier of every node.
///
/// `y ∈ DF(n)` iff `n` dominates a predecessor of `y` but does not strictly dominate `y`.
/// Only join nodes (two or more reachable predecessors) can be in a frontier: for each
/// predecessor `p` of a join node `y`, the walk climbs the idom chain from `p` until it
/// reaches `idom(y)`, adding `y` to the frontier of every node it passes.
///
/// The result is indexed by node; sets are ordered so that consumers iterate them
/// deterministically.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::graph::{
///     algorithms::{compute_dominance_frontiers, compute_dominators},
///     DirectedGraph,
/// };
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let left = graph.add_node("left");
/// let right = graph.add_node("right");
/// let join = graph.add_node("join");
/// graph.add_edge(entry, left, ())?;
/// graph.add_edge(entry, right, ())?;
/// graph.add_edge(left, join, ())?;
/// graph.add_edge(right, join, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// let frontiers = compute_dominance_frontiers(&graph, &tree);
/// assert!(frontiers[left.index()].contains(&join));
/// assert!(frontiers[entry.index()].is_empty());
/// # Ok::<(), goscope::Error>(())
/// ```
pub fn compute_dominance_frontiers<G>(graph: &G, tree: &DominatorTree) -> Vec<BTreeSet<NodeId>>
where
    G: Predecessors,
{
    let node_count = graph.node_count();
    let mut frontiers = vec![BTreeSet::new(); node_count];

    for idx in 0..node_count {
        let node = NodeId::new(idx);
        if !tree.is_reachable(node) {
            continue;
        }

        let preds: Vec<NodeId> = graph
            .predecessors(node)
            .filter(|&p| tree.is_reachable(p))
            .collect();
        if preds.len() < 2 {
            continue;
        }

        let stop = tree.immediate_dominator(node);
        for pred in preds {
            let mut runner = Some(pred);
            while let Some(current) = runner {
                if Some(current) == stop {
                    break;
                }
                frontiers[current.index()].insert(node);
                runner = tree.immediate_dominator(current);
            }
        }
    }

    frontiers
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::utils::graph::{
        algorithms::dominators::{compute_dominance_frontiers, compute_dominators},
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

    fn set(nodes: &[usize]) -> BTreeSet<NodeId> {
        nodes.iter().map(|&i| n(i)).collect()
    }

    #[test]
    fn test_dominator_empty_graph() {
        let graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.immediate_dominator(n(0)), None);
    }

    #[test]
    fn test_dominator_single_node() {
        let graph = graph_from(1, &[]);
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.immediate_dominator(n(0)), None);
        assert!(tree.dominates(n(0), n(0)));
        assert_eq!(tree.depth(n(0)), 0);
    }

    #[test]
    fn test_dominator_linear_chain() {
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(3)), Some(n(2)));
        assert_eq!(tree.depth(n(3)), 3);
        assert_eq!(
            tree.dominators(n(3)).collect::<Vec<_>>(),
            vec![n(3), n(2), n(1), n(0)]
        );
        assert_eq!(tree.dominance_set(n(2)).iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_dominator_diamond() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(3)), Some(n(0)));
        assert!(!tree.dominates(n(1), n(3)));
        assert_eq!(tree.children(n(0)), &[n(1), n(2), n(3)]);
    }

    #[test]
    fn test_dominator_loop() {
        // 0 -> 1 (header) -> 2 (body) -> 1, 1 -> 3 (exit)
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(2)), Some(n(1)));
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(1)));
        assert!(tree.dominates(n(1), n(2)));
    }

    #[test]
    fn test_dominator_unreachable_node() {
        let graph = graph_from(3, &[(0, 1), (2, 1)]);
        let tree = compute_dominators(&graph, n(0));

        assert!(!tree.is_reachable(n(2)));
        assert_eq!(tree.immediate_dominator(n(2)), None);
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.dominators(n(2)).count(), 0);
    }

    #[test]
    fn test_idom_is_closest_strict_dominator() {
        // if-then-else nested in a loop
        let graph = graph_from(
            7,
            &[(0, 1), (1, 2), (2, 3), (2, 4), (3, 5), (4, 5), (5, 1), (1, 6)],
        );
        let tree = compute_dominators(&graph, n(0));

        for node in 1..7 {
            let node = n(node);
            let idom = tree.immediate_dominator(node).unwrap();
            assert!(tree.strictly_dominates(idom, node));
            for other in tree.dominance_set(node).iter().map(NodeId::new) {
                if other != node && other != idom {
                    assert!(!tree.dominates(idom, other));
                }
            }
        }
        assert_eq!(tree.immediate_dominator(n(5)), Some(n(2)));
    }

    #[test]
    fn test_dominance_frontier_diamond() {
        let graph = graph_from(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));
        let df = compute_dominance_frontiers(&graph, &tree);

        assert_eq!(df[1], set(&[3]));
        assert_eq!(df[2], set(&[3]));
        assert!(df[0].is_empty());
        assert!(df[3].is_empty());
    }

    #[test]
    fn test_dominance_frontier_loop() {
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let tree = compute_dominators(&graph, n(0));
        let df = compute_dominance_frontiers(&graph, &tree);

        assert_eq!(df[2], set(&[1]));
        assert_eq!(df[1], set(&[1]));
        assert!(df[0].is_empty());
    }

    #[test]
    fn test_dominance_frontier_self_loop() {
        let graph = graph_from(3, &[(0, 1), (1, 1), (1, 2)]);
        let tree = compute_dominators(&graph, n(0));
        let df = compute_dominance_frontiers(&graph, &tree);
        assert_eq!(df[1], set(&[1]));
    }

    #[test]
    fn test_dominators_are_deterministic() {
        let graph = graph_from(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (4, 3)]);
        let first = compute_dominators(&graph, n(0));
        let second = compute_dominators(&graph, n(0));
        assert_eq!(first, second);
    }
}
