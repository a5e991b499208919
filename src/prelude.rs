//! # goscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the goscope library. Import it to get the entry points, the AST constructors and
//! the graph traits in one line.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all goscope operations
pub use crate::Error;

/// The result type used throughout goscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

pub use crate::{build_cfg, solve, to_ssa};

pub use crate::analysis::{analyze_function, analyze_functions, AnalysisConfig, Analyses};

// ================================================================================================
// Syntax Tree
// ================================================================================================

pub use crate::ast::{build::*, Expr, FuncDecl, Stmt};

// ================================================================================================
// Control Flow and SSA
// ================================================================================================

pub use crate::analysis::{
    BasicBlock, BlockKind, CfgBuilder, CfgEdgeKind, ControlFlowGraph, NaturalLoop, PhiFunction,
    SsaCfg, SsaConverter, SsaName,
};

// ================================================================================================
// Data Flow
// ================================================================================================

pub use crate::analysis::dataflow::{
    AvailableExpressions, DataFlowAnalysis, DataFlowProblem, DataFlowResults, DataFlowSolver,
    Direction, Liveness, Meet, ReachingDefinitions,
};

// ================================================================================================
// Graph Infrastructure
// ================================================================================================

pub use crate::utils::{
    graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
    BitSet,
};
