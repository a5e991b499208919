//! Control Flow Graph (CFG) construction and analysis.
//!
//! The [`CfgBuilder`] lowers one function body into a [`ControlFlowGraph`]: an arena of
//! [`BasicBlock`]s connected by labelled edges, with a single entry and a single exit.
//!
//! # Key Components
//!
//! - [`CfgBuilder`] - AST to CFG lowering
//! - [`ControlFlowGraph`] - the graph with traversals, dominators, loops and DOT output
//! - [`BasicBlock`], [`BlockKind`], [`BlockStmt`] - blocks and the statements they reference
//! - [`CfgEdgeKind`] - classification of edges by the construct that created them
//! - [`CfgExport`] - serializable nodes-and-edges view for external visualizers
//!
//! # Guarantees
//!
//! A graph returned by the builder satisfies:
//!
//! - the entry has no predecessors and the exit has no successors;
//! - every block is reachable from the entry (the exit may be unreachable when the body
//!   never terminates, e.g. `L: goto L`);
//! - successor and predecessor lists agree, and no two edges join the same pair of blocks;
//! - every `return` lives in a `return` block whose only successor is the exit;
//! - every loop carries a back edge from its body or post block to its header.
//!
//! # Lazy Computation
//!
//! Dominator trees and natural loops are computed on first access and cached using
//! [`std::sync::OnceLock`], so a graph can be shared between threads after construction.
//!
//! # Examples
//!
//! ```rust
//! use goscope::{analysis::BlockKind, ast::build::*, build_cfg};
//!
//! let f = func(
//!     "f",
//!     &["x"],
//!     vec![
//!         if_stmt(lt(ident("x"), int(0)), vec![ret(vec![neg(int(1))])]),
//!         ret(vec![ident("x")]),
//!     ],
//! );
//! let cfg = build_cfg(&f)?;
//!
//! let returns = cfg.blocks().filter(|b| b.kind == BlockKind::Return).count();
//! assert_eq!(returns, 2);
//! assert_eq!(cfg.predecessors(cfg.exit()).count(), 2);
//! # Ok::<(), goscope::Error>(())
//! ```

mod block;
mod builder;
mod edge;
mod export;
mod graph;

pub(crate) use block::write_range;
pub use block::{BasicBlock, BlockKind, BlockStmt};
pub use builder::{CfgBuilder, DEFAULT_MAX_NESTING_DEPTH};
pub use edge::CfgEdgeKind;
pub use export::{CfgExport, ExportedEdge, ExportedNode};
pub use graph::{CfgStats, ControlFlowGraph, NaturalLoop};
