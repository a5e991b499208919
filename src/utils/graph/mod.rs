//! Generic directed graph infrastructure.
//!
//! The control-flow graph is stored as an arena: an ordered vector of nodes with
//! successor/predecessor edges kept as integer indices rather than references. This
//! module provides that arena plus the algorithms the analyses need.
//!
//! - [`NodeId`], [`EdgeId`] - strongly-typed indices
//! - [`DirectedGraph`] - the arena with adjacency lists
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - traits the
//!   algorithms are written against
//! - [`algorithms`] - traversals, structural back edges, dominators and dominance frontiers
//!
//! # Example
//!
//! ```rust
//! use goscope::utils::graph::{algorithms, DirectedGraph};
//!
//! let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
//! let entry = graph.add_node("entry");
//! let a = graph.add_node("a");
//! let b = graph.add_node("b");
//! let exit = graph.add_node("exit");
//! graph.add_edge(entry, a, ())?;
//! graph.add_edge(entry, b, ())?;
//! graph.add_edge(a, exit, ())?;
//! graph.add_edge(b, exit, ())?;
//!
//! let dominators = algorithms::compute_dominators(&graph, entry);
//! assert_eq!(dominators.immediate_dominator(exit), Some(entry));
//! # Ok::<(), goscope::Error>(())
//! ```

mod directed;
mod edge;
mod node;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use edge::EdgeId;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
