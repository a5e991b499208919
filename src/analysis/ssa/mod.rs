//! Static Single Assignment (SSA) form.
//!
//! Converts a [`ControlFlowGraph`](crate::analysis::ControlFlowGraph) into a graph where
//! every variable version is assigned exactly once, with φ-functions at the blocks where
//! different versions meet.
//!
//! # Architecture
//!
//! - [`SsaName`] and [`DefSite`] - versioned variables and where they are defined
//! - [`PhiFunction`] - merges at control flow joins
//! - [`SsaStatement`] - a CFG statement with its uses and definitions resolved to versions
//! - [`SsaNode`] / [`SsaCfg`] - the renamed graph plus the dominance information used to build it
//! - [`SsaConverter`] - construction (Cytron et al.)
//! - [`SsaViolation`] - the verifier's findings
//!
//! # Usage
//!
//! ```rust
//! use goscope::{ast::build::*, build_cfg, to_ssa};
//!
//! let f = func(
//!     "count",
//!     &[],
//!     vec![
//!         assign("i", int(0)),
//!         while_loop(lt(ident("i"), int(10)), vec![inc("i")]),
//!     ],
//! );
//! let cfg = build_cfg(&f)?;
//! let ssa = to_ssa(&cfg)?;
//!
//! for node in ssa.nodes() {
//!     for phi in &node.phis {
//!         println!("{}: {phi}", node.id);
//!     }
//! }
//! assert_eq!(ssa.phi_count(), 1);
//! # Ok::<(), goscope::Error>(())
//! ```
//!
//! # References
//!
//! - Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!   Control Dependence Graph", ACM TOPLAS 1991
//! - Cooper & Torczon, "Engineering a Compiler", Chapter 9

mod builder;
mod function;
mod phi;
mod statement;
mod variable;
mod verify;

pub use builder::{SsaConfig, SsaConverter};
pub use function::{SsaCfg, SsaNode};
pub use phi::PhiFunction;
pub use statement::SsaStatement;
pub use variable::{DefSite, SsaName};
pub use verify::SsaViolation;
