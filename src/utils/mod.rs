//! Shared infrastructure: bit sets, the graph arena and its algorithms, and DOT helpers.

mod bitset;
mod dot;

pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
