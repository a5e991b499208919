// Copyright 2025 The goscope Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # goscope
//!
//! Intraprocedural analysis of Go function bodies: control flow graphs, static single
//! assignment form and monotone data flow analysis.
//!
//! `goscope` takes the syntax tree of a single function and answers the questions an
//! optimizer or linter asks about it: which blocks exist and how control moves between
//! them, which definition of a variable a use refers to, which variables are live, which
//! definitions reach a point and which expressions are already computed.
//!
//! ## Features
//!
//! - **Control flow graphs** for the full statement set: `if`, `for`, `range`, `switch`
//!   with `fallthrough`, `select`, labelled `break`/`continue`, `goto`, `defer` and `go`
//! - **Dominators, dominance frontiers and natural loops**, computed lazily
//! - **Minimal SSA** with φ-functions on the iterated dominance frontier and an optional
//!   verifier for the single-assignment property
//! - **A generic data flow solver** over bit-set domains, with liveness, reaching
//!   definitions and available expressions built in
//! - **Parallel batch analysis** of many functions with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use goscope::{ast::build::*, build_cfg, to_ssa, analysis::dataflow::Liveness};
//!
//! // func f(x) { if x > 0 { y = 1 } else { y = 2 }; return y }
//! let f = func(
//!     "f",
//!     &["x"],
//!     vec![
//!         if_else(
//!             gt(ident("x"), int(0)),
//!             vec![assign("y", int(1))],
//!             vec![assign("y", int(2))],
//!         ),
//!         ret(vec![ident("y")]),
//!     ],
//! );
//!
//! let cfg = build_cfg(&f)?;
//! let ssa = to_ssa(&cfg)?;
//! assert_eq!(ssa.phi_count(), 1);
//!
//! let live = Liveness::new(&cfg).compute(&cfg)?;
//! assert!(live.is_live_in(cfg.entry(), "x"));
//! # Ok::<(), goscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ast`] - The input syntax tree and constructors for building it by hand
//! - [`analysis`] - CFG construction, SSA conversion, data flow analyses and the
//!   per-function pipeline
//! - [`utils`] - Graph storage and algorithms, bit sets and DOT helpers
//!
//! Every graph in this crate shares [`utils::graph::NodeId`]s with the CFG it was built
//! from, so results of different stages can be joined by node.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). An operation either produces its
//! complete output or an error; partial graphs and partial fixed points are never
//! returned.
//!
//! ```rust
//! use goscope::{ast::build::*, build_cfg, Error};
//!
//! let f = func("f", &[], vec![cont()]);
//! assert!(matches!(build_cfg(&f), Err(Error::InvalidAst { .. })));
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and spans at `debug` and `trace` level; install a
//! subscriber to see them.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use goscope::prelude::*;
///
/// let f = func("f", &[], vec![assign("x", int(1))]);
/// let cfg: ControlFlowGraph<'_> = build_cfg(&f)?;
/// assert_eq!(cfg.block_count(), 3);
/// # Ok::<(), goscope::Error>(())
/// ```
pub mod prelude;

/// The syntax tree of a Go function.
///
/// The tree is produced by an external parser, or by the constructors in [`ast::build`].
/// The analyses only borrow it.
pub mod ast;

/// Control flow, SSA and data flow analysis.
pub mod analysis;

/// Shared infrastructure: graphs, bit sets and DOT rendering.
pub mod utils;

pub use error::{Error, Result};

use crate::analysis::{
    dataflow::{DataFlowAnalysis, DataFlowCfg, DataFlowResults, DataFlowSolver},
    CfgBuilder, ControlFlowGraph, SsaCfg, SsaConverter,
};

/// Builds the control flow graph of `func` with the default nesting limit.
///
/// # Errors
///
/// Returns [`Error::InvalidAst`] for unresolved labels, `break`/`continue`/`fallthrough`
/// outside their enclosing construct, or nesting deeper than
/// [`DEFAULT_MAX_NESTING_DEPTH`](analysis::DEFAULT_MAX_NESTING_DEPTH).
pub fn build_cfg(func: &ast::FuncDecl) -> Result<ControlFlowGraph<'_>> {
    CfgBuilder::new().build(func)
}

/// Converts `cfg` to SSA form and verifies the result.
///
/// # Errors
///
/// Returns [`Error::NoEntry`] if `cfg` has no entry block and
/// [`Error::SsaInternalError`] if verification fails.
pub fn to_ssa<'cfg, 'ast>(cfg: &'cfg ControlFlowGraph<'ast>) -> Result<SsaCfg<'cfg, 'ast>> {
    SsaConverter::default().convert(cfg)
}

/// Solves `analysis` over `graph` with the default iteration bound.
///
/// # Errors
///
/// Returns [`Error::DataFlowDiverged`] if no fixed point is reached within
/// `|N| · |D| + 1` passes.
pub fn solve<A, G>(analysis: &A, graph: &G) -> Result<DataFlowResults>
where
    A: DataFlowAnalysis + ?Sized,
    G: DataFlowCfg,
{
    DataFlowSolver::new().solve(analysis, graph)
}
