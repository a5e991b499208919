//! Trait definitions for graph abstractions.
//!
//! Algorithms in [`algorithms`](crate::utils::graph::algorithms) are written against these
//! traits so they run unchanged on the raw [`DirectedGraph`](crate::utils::graph::DirectedGraph),
//! on a [`ControlFlowGraph`](crate::analysis::ControlFlowGraph) and on test doubles.
//!
//! - [`GraphBase`] - node count and ordered node iteration
//! - [`Successors`] - outgoing adjacency
//! - [`Predecessors`] - incoming adjacency
//! - [`RootedGraph`] - a designated entry node

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns all node ids in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Returns the successors of `node` in edge insertion order.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not part of the graph.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Returns the predecessors of `node` in edge insertion order.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not part of the graph.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a single designated entry node, as required for dominator computation.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EdgeList {
        nodes: usize,
        edges: Vec<(usize, usize)>,
    }

    impl GraphBase for EdgeList {
        fn node_count(&self) -> usize {
            self.nodes
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.nodes).map(NodeId::new)
        }
    }

    impl Successors for EdgeList {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node.index())
                .map(|&(_, dst)| NodeId::new(dst))
        }
    }

    impl Predecessors for EdgeList {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node.index())
                .map(|&(src, _)| NodeId::new(src))
        }
    }

    impl RootedGraph for EdgeList {
        fn entry(&self) -> NodeId {
            NodeId::new(0)
        }
    }

    #[test]
    fn test_adjacency_through_traits() {
        let graph = EdgeList {
            nodes: 3,
            edges: vec![(0, 1), (0, 2), (1, 2)],
        };

        assert_eq!(graph.node_ids().count(), 3);
        assert_eq!(
            graph.successors(NodeId::new(0)).collect::<Vec<_>>(),
            vec![NodeId::new(1), NodeId::new(2)]
        );
        assert_eq!(
            graph.predecessors(NodeId::new(2)).collect::<Vec<_>>(),
            vec![NodeId::new(0), NodeId::new(1)]
        );
        assert_eq!(graph.entry(), NodeId::new(0));
    }
}
