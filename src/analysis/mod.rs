//! Program analysis for Go function bodies.
//!
//! This module turns a parsed function into the intermediate forms compiler passes and
//! static analysers work on. It builds upon the generic graph infrastructure in
//! [`crate::utils::graph`].
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Control flow graph construction from the AST
//! - [`ssa`] - Static single assignment form with φ-functions
//! - [`dataflow`] - Monotone data flow framework and the standard analyses
//!
//! On top of these, [`analyze_function`] runs a configurable pipeline over one function
//! and [`analyze_functions`] over many, in parallel.
//!
//! # Usage
//!
//! ```rust
//! use goscope::{analysis::CfgBuilder, ast::build::*};
//!
//! let f = func(
//!     "abs",
//!     &["x"],
//!     vec![
//!         if_stmt(lt(ident("x"), int(0)), vec![ret(vec![neg(ident("x"))])]),
//!         ret(vec![ident("x")]),
//!     ],
//! );
//! let cfg = CfgBuilder::new().build(&f)?;
//!
//! // The dominator tree is computed on first use.
//! let dominators = cfg.dominators();
//! assert!(cfg.blocks().all(|b| dominators.dominates(cfg.entry(), b.id)));
//! # Ok::<(), goscope::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
pub mod ssa;

mod config;
mod pipeline;

pub use cfg::{
    BasicBlock, BlockKind, BlockStmt, CfgBuilder, CfgEdgeKind, CfgExport, CfgStats,
    ControlFlowGraph, NaturalLoop, DEFAULT_MAX_NESTING_DEPTH,
};
pub use config::{Analyses, AnalysisConfig};
pub use pipeline::{
    analyze_function, analyze_functions, FunctionAnalysis, SsaSummary, Stage, StageFailure,
};
pub use ssa::{
    DefSite, PhiFunction, SsaCfg, SsaConfig, SsaConverter, SsaName, SsaNode, SsaStatement,
    SsaViolation,
};
