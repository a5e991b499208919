//! Graph algorithms used by the CFG, SSA and data-flow layers.
//!
//! ## Traversal
//!
//! - [`dfs`] / [`bfs`] - lazy traversals from a start node
//! - [`postorder`] / [`reverse_postorder`] - iteration orders for backward and forward
//!   data-flow problems
//! - [`back_edges`] - edges that close a cycle in a depth-first search
//!
//! ## Dominance
//!
//! - [`compute_dominators`] - iterative dominance-set computation over reverse postorder
//! - [`compute_dominance_frontiers`] - frontier sets via the runner walk on join nodes
//! - [`DominatorTree`] - idom map, dominance sets and tree children
//!
//! | Algorithm | Time Complexity |
//! |-----------|-----------------|
//! | DFS/BFS/postorder | O(V + E) |
//! | Dominators | O(V · E · V/64) worst case, a handful of passes in practice |
//! | Dominance frontiers | O(E · average frontier size) |

mod dominators;
mod traversal;

pub use dominators::{compute_dominance_frontiers, compute_dominators, DominatorTree};
pub use traversal::{back_edges, bfs, dfs, postorder, reverse_postorder, BfsIterator, DfsIterator};
